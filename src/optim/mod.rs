pub mod adam;
pub mod optimizer;

pub use adam::{Adam, AdamState, Moments};
pub use optimizer::{Optimizer, OptimizerState};
