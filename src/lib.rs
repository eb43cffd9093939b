pub mod error;
pub mod math;
pub mod autograd;
pub mod activation;
pub mod layers;
pub mod network;
pub mod loss;
pub mod optim;
pub mod data;
pub mod sample;
pub mod checkpoint;
pub mod train;
pub mod config;

// Convenience re-exports
pub use error::{GanError, Result};
pub use math::tensor::Tensor;
pub use autograd::{grad, Gradients, Var};
pub use activation::activation::ActivationFunction;
pub use layers::dense::Layer;
pub use network::{Discriminator, GanArchitecture, Generator, Module, Network};
pub use loss::{gradient_penalty, WassersteinLoss};
pub use optim::{Adam, Optimizer};
pub use data::{DataLoader, DataSource, ImageFolder};
pub use checkpoint::{CheckpointRecord, CheckpointStore};
pub use train::{Adversaries, LossHistory, Resume, SessionConfig, TrainingSession};
pub use config::TrainParams;
