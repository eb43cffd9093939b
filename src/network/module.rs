use std::collections::BTreeMap;

use crate::autograd::Var;
use crate::error::{GanError, Result};
use crate::math::tensor::Tensor;

/// Named parameter snapshot, ordered by name so serialized files are stable.
pub type StateDict = BTreeMap<String, Tensor>;

/// A parametric function the trainer can evaluate and update.
pub trait Module {
    fn forward(&self, input: &Var) -> Result<Var>;

    /// Parameters in a fixed order, with names unique within the module.
    fn named_parameters(&self) -> Vec<(String, &Var)>;

    fn named_parameters_mut(&mut self) -> Vec<(String, &mut Var)>;

    fn num_parameters(&self) -> usize {
        self.named_parameters().iter().map(|(_, p)| p.value().numel()).sum()
    }

    fn state_dict(&self) -> StateDict {
        self.named_parameters()
            .into_iter()
            .map(|(name, param)| (name, param.value().clone()))
            .collect()
    }

    /// Replaces every parameter with the tensor stored under its name.
    /// Missing or extra names and shape changes are rejected before anything
    /// is written.
    fn load_state_dict(&mut self, dict: &StateDict) -> Result<()> {
        {
            let params = self.named_parameters();
            if params.len() != dict.len() {
                return Err(GanError::Config(format!(
                    "state dict has {} entries, module has {} parameters",
                    dict.len(),
                    params.len()
                )));
            }
            for (name, param) in &params {
                let stored = dict.get(name).ok_or_else(|| {
                    GanError::Config(format!("state dict is missing parameter '{name}'"))
                })?;
                if stored.shape() != param.shape() {
                    return Err(GanError::shape("load_state_dict", param.shape(), stored.shape()));
                }
            }
        }
        for (name, param) in self.named_parameters_mut() {
            if let Some(stored) = dict.get(&name) {
                *param = Var::variable(stored.clone());
            }
        }
        Ok(())
    }
}
