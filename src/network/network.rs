use rand::Rng;

use crate::{activation::activation::ActivationFunction, autograd::Var, error::Result, layers::dense::Layer};
use crate::network::module::Module;
use crate::network::spec::NetworkSpec;

/// Stack of dense layers applied in order.
#[derive(Debug, Clone)]
pub struct Network {
    pub layers: Vec<Layer>,
}

impl Network {
    /// Builds a network from (size, input_size, activation) tuples.
    pub fn new<R: Rng + ?Sized>(layer_specs: Vec<(usize, usize, ActivationFunction)>, rng: &mut R) -> Network {
        let layers = layer_specs.into_iter()
            .map(|(size, input_size, activation)| Layer::new(size, input_size, activation, rng))
            .collect();
        Network { layers }
    }

    /// Builds a freshly initialized network after validating the spec.
    pub fn from_spec<R: Rng + ?Sized>(spec: &NetworkSpec, rng: &mut R) -> Result<Network> {
        spec.validate()?;
        Ok(Network::new(
            spec.layers.iter().map(|l| (l.size, l.input_size, l.activation)).collect(),
            rng,
        ))
    }

    pub fn input_size(&self) -> usize {
        self.layers.first().map(|l| l.input_size).unwrap_or(0)
    }

    pub fn output_size(&self) -> usize {
        self.layers.last().map(|l| l.size).unwrap_or(0)
    }
}

impl Module for Network {
    /// Forward pass over a `[batch, input_size]` input.
    fn forward(&self, input: &Var) -> Result<Var> {
        let mut current = input.clone();
        for layer in &self.layers {
            current = layer.feed_from(&current)?;
        }
        Ok(current)
    }

    fn named_parameters(&self) -> Vec<(String, &Var)> {
        self.layers.iter().enumerate()
            .flat_map(|(i, layer)| [
                (format!("layers.{i}.weights"), &layer.weights),
                (format!("layers.{i}.biases"), &layer.biases),
            ])
            .collect()
    }

    fn named_parameters_mut(&mut self) -> Vec<(String, &mut Var)> {
        self.layers.iter_mut().enumerate()
            .flat_map(|(i, layer)| [
                (format!("layers.{i}.weights"), &mut layer.weights),
                (format!("layers.{i}.biases"), &mut layer.biases),
            ])
            .collect()
    }
}
