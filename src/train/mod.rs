pub mod critic;
pub mod generator;
pub mod epoch;
pub mod session;
pub mod epoch_stats;
pub mod train_config;
pub mod progress_log;

pub use critic::critic_step;
pub use generator::generator_step;
pub use epoch::{run_epoch, Adversaries, EpochLosses};
pub use session::{LossHistory, Resume, TrainingSession};
pub use epoch_stats::EpochStats;
pub use train_config::SessionConfig;
pub use progress_log::ProgressLog;
