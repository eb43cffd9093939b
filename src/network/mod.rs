pub mod gan;
pub mod module;
pub mod network;
pub mod spec;

pub use gan::{Discriminator, GanArchitecture, Generator, ImageShape};
pub use module::{Module, StateDict};
pub use network::Network;
pub use spec::{NetworkSpec, LayerSpec};
