use rand::Rng;

use crate::{activation::activation::ActivationFunction, autograd::Var, error::Result, math::tensor::Tensor};

/// Fully connected layer: `activation(x · W + b)`.
///
/// `weights` is `[input_size, size]` and `biases` is `[1, size]`; both are
/// gradient-tracked leaves that the optimizer swaps out after each step.
#[derive(Debug, Clone)]
pub struct Layer {
    pub size: usize,
    pub input_size: usize,
    pub weights: Var,
    pub biases: Var,
    pub activator: ActivationFunction,
}

impl Layer {
    pub fn new<R: Rng + ?Sized>(size: usize, input_size: usize, activation: ActivationFunction, rng: &mut R) -> Layer {
        let weights = if activation.prefers_he_init() {
            Tensor::he(input_size, size, rng)
        } else {
            Tensor::xavier(input_size, size, rng)
        };

        Layer {
            size,
            input_size,
            weights: Var::variable(weights),
            biases: Var::variable(Tensor::zeros(&[1, size])),
            activator: activation,
        }
    }

    /// Forward pass over a `[batch, input_size]` input.
    pub fn feed_from(&self, input: &Var) -> Result<Var> {
        let z = input.matmul(&self.weights)?.add_bias(&self.biases)?;
        Ok(z.activate(self.activator))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn output_has_one_row_per_sample() {
        let mut rng = StdRng::seed_from_u64(1);
        let layer = Layer::new(4, 3, ActivationFunction::ReLU, &mut rng);
        let x = Var::constant(Tensor::ones(&[5, 3]));
        let y = layer.feed_from(&x).unwrap();
        assert_eq!(y.shape(), &[5, 4]);
        assert!(y.value().data().iter().all(|&v| v >= 0.0));
    }

    #[test]
    fn wrong_input_width_is_a_shape_error() {
        let mut rng = StdRng::seed_from_u64(1);
        let layer = Layer::new(4, 3, ActivationFunction::Identity, &mut rng);
        let x = Var::constant(Tensor::ones(&[5, 2]));
        assert!(layer.feed_from(&x).is_err());
    }
}
