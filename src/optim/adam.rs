use std::collections::BTreeMap;

use serde::{Serialize, Deserialize};

use crate::autograd::{Gradients, Var};
use crate::error::{GanError, Result};
use crate::math::tensor::Tensor;
use crate::optim::optimizer::{Optimizer, OptimizerState};

/// First and second moment estimates of one parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Moments {
    pub m: Vec<f64>,
    pub v: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdamState {
    pub lr: f64,
    pub beta1: f64,
    pub beta2: f64,
    pub eps: f64,
    pub step: u64,
    /// Keyed by parameter name.
    pub moments: BTreeMap<String, Moments>,
}

/// Adam (Kingma & Ba, 2015) with bias correction.
#[derive(Debug, Clone)]
pub struct Adam {
    lr: f64,
    beta1: f64,
    beta2: f64,
    eps: f64,
    step: u64,
    moments: BTreeMap<String, Moments>,
}

impl Adam {
    /// Defaults: beta1 = 0.9, beta2 = 0.999, eps = 1e-8.
    pub fn new(lr: f64) -> Adam {
        Adam {
            lr,
            beta1: 0.9,
            beta2: 0.999,
            eps: 1e-8,
            step: 0,
            moments: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn betas(mut self, beta1: f64, beta2: f64) -> Self {
        self.beta1 = beta1;
        self.beta2 = beta2;
        self
    }

    #[must_use]
    pub fn eps(mut self, eps: f64) -> Self {
        self.eps = eps;
        self
    }

    pub fn step_count(&self) -> u64 {
        self.step
    }

    fn validate_hyperparams(&self) -> Result<()> {
        if !self.lr.is_finite() || self.lr < 0.0 {
            return Err(GanError::Config("adam requires a finite non-negative learning rate".into()));
        }
        if !(0.0..1.0).contains(&self.beta1) || !(0.0..1.0).contains(&self.beta2) {
            return Err(GanError::Config("adam betas must be in [0, 1)".into()));
        }
        if !self.eps.is_finite() || self.eps <= 0.0 {
            return Err(GanError::Config("adam requires finite eps > 0".into()));
        }
        Ok(())
    }
}

impl Optimizer for Adam {
    fn step(&mut self, params: Vec<(String, &mut Var)>, grads: &Gradients) -> Result<()> {
        self.validate_hyperparams()?;
        let t = self.step.checked_add(1)
            .ok_or_else(|| GanError::Config("adam step counter overflow".into()))?;
        self.step = t;

        let bias_correction1 = 1.0 - self.beta1.powf(t as f64);
        let bias_correction2 = 1.0 - self.beta2.powf(t as f64);

        for (name, param) in params {
            let Some(grad) = grads.get(param) else { continue };
            if grad.shape() != param.shape() {
                return Err(GanError::shape("adam step", param.shape(), grad.shape()));
            }

            let n = grad.numel();
            let moments = self.moments.entry(name.clone()).or_insert_with(|| Moments {
                m: vec![0.0; n],
                v: vec![0.0; n],
            });
            if moments.m.len() != n {
                return Err(GanError::Config(format!(
                    "adam moment buffer for '{name}' has {} entries, gradient has {n}",
                    moments.m.len()
                )));
            }

            let mut updated = param.value().data().to_vec();
            for (i, &g) in grad.data().iter().enumerate() {
                moments.m[i] = self.beta1 * moments.m[i] + (1.0 - self.beta1) * g;
                moments.v[i] = self.beta2 * moments.v[i] + (1.0 - self.beta2) * g * g;
                let m_hat = moments.m[i] / bias_correction1;
                let v_hat = moments.v[i] / bias_correction2;
                updated[i] -= self.lr * m_hat / (v_hat.sqrt() + self.eps);
            }
            *param = Var::variable(Tensor::new(param.shape().to_vec(), updated)?);
        }
        Ok(())
    }

    fn state_dict(&self) -> OptimizerState {
        OptimizerState::Adam(AdamState {
            lr: self.lr,
            beta1: self.beta1,
            beta2: self.beta2,
            eps: self.eps,
            step: self.step,
            moments: self.moments.clone(),
        })
    }

    fn load_state_dict(&mut self, state: &OptimizerState) -> Result<()> {
        let OptimizerState::Adam(state) = state;
        for (name, moments) in &state.moments {
            if moments.m.len() != moments.v.len() {
                return Err(GanError::Config(format!(
                    "adam state for '{name}' has mismatched moment lengths"
                )));
            }
        }
        self.lr = state.lr;
        self.beta1 = state.beta1;
        self.beta2 = state.beta2;
        self.eps = state.eps;
        self.step = state.step;
        self.moments = state.moments.clone();
        self.validate_hyperparams()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn first_step_moves_by_learning_rate() {
        // With bias correction the first Adam step is lr * sign(g).
        let mut adam = Adam::new(0.1);
        let mut w = Var::variable(Tensor::new(vec![2], vec![1.0, -1.0]).unwrap());
        let loss = w.mul(&Var::constant(Tensor::new(vec![2], vec![3.0, -0.5]).unwrap())).unwrap().sum().unwrap();
        let grads = loss.backward().unwrap();
        adam.step(vec![("w".to_string(), &mut w)], &grads).unwrap();

        assert_abs_diff_eq!(w.value().data()[0], 0.9, epsilon = 1e-6);
        assert_abs_diff_eq!(w.value().data()[1], -0.9, epsilon = 1e-6);
        assert_eq!(adam.step_count(), 1);
        assert!(w.is_leaf() && w.requires_grad());
    }

    #[test]
    fn parameters_without_gradients_are_untouched() {
        let mut adam = Adam::new(0.1);
        let mut used = Var::variable(Tensor::scalar(1.0));
        let mut unused = Var::variable(Tensor::scalar(5.0));
        let grads = used.scale(2.0).backward().unwrap();
        adam.step(
            vec![("used".to_string(), &mut used), ("unused".to_string(), &mut unused)],
            &grads,
        ).unwrap();
        assert_eq!(unused.value().data(), &[5.0]);
        assert!(!adam.state_dict_moments().contains_key("unused"));
    }

    #[test]
    fn state_dict_round_trip_continues_identically() {
        let run = |adam: &mut Adam, w: &mut Var| {
            let grads = w.square().unwrap().sum().unwrap().backward().unwrap();
            adam.step(vec![("w".to_string(), w)], &grads).unwrap();
        };

        let mut a = Adam::new(0.05).betas(0.5, 0.9);
        let mut wa = Var::variable(Tensor::new(vec![3], vec![0.3, -0.7, 1.1]).unwrap());
        run(&mut a, &mut wa);

        let mut b = Adam::new(1.0);
        b.load_state_dict(&a.state_dict()).unwrap();
        let mut wb = Var::variable(wa.value().clone());

        run(&mut a, &mut wa);
        run(&mut b, &mut wb);
        assert_eq!(wa.value(), wb.value());
        assert_eq!(a.state_dict(), b.state_dict());
    }

    #[test]
    fn invalid_betas_are_rejected() {
        let mut adam = Adam::new(0.1).betas(1.0, 0.999);
        let mut w = Var::variable(Tensor::scalar(1.0));
        let grads = w.scale(1.0).backward().unwrap();
        assert!(matches!(adam.step(vec![("w".into(), &mut w)], &grads), Err(GanError::Config(_))));
    }

    impl Adam {
        fn state_dict_moments(&self) -> &BTreeMap<String, Moments> {
            &self.moments
        }
    }
}
