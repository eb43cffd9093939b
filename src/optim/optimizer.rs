use serde::{Serialize, Deserialize};

use crate::autograd::{Gradients, Var};
use crate::error::Result;
use crate::optim::adam::AdamState;

/// Serializable optimizer snapshot, tagged by optimizer kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OptimizerState {
    Adam(AdamState),
}

/// Applies gradient updates to a module's parameters.
pub trait Optimizer {
    /// One update using the gradients of the latest backward pass. Parameters
    /// without a gradient in `grads` are left alone.
    fn step(&mut self, params: Vec<(String, &mut Var)>, grads: &Gradients) -> Result<()>;

    fn state_dict(&self) -> OptimizerState;

    fn load_state_dict(&mut self, state: &OptimizerState) -> Result<()>;
}
