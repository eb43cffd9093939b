use rand::Rng;
use serde::{Serialize, Deserialize};

use crate::activation::activation::ActivationFunction;
use crate::autograd::Var;
use crate::error::{GanError, Result};
use crate::network::module::Module;
use crate::network::network::Network;
use crate::network::spec::{LayerSpec, NetworkSpec};

/// `(channels, height, width)` of one image.
pub type ImageShape = [usize; 3];

/// Maps latent noise `[n, z_dim]` to images `[n, c, h, w]`.
#[derive(Debug, Clone)]
pub struct Generator {
    network: Network,
    image_shape: ImageShape,
}

impl Generator {
    pub fn new(network: Network, image_shape: ImageShape) -> Result<Generator> {
        let pixels: usize = image_shape.iter().product();
        if network.output_size() != pixels {
            return Err(GanError::Config(format!(
                "generator outputs {} values, image shape {:?} needs {}",
                network.output_size(), image_shape, pixels
            )));
        }
        Ok(Generator { network, image_shape })
    }

    pub fn z_dim(&self) -> usize {
        self.network.input_size()
    }

    pub fn image_shape(&self) -> ImageShape {
        self.image_shape
    }
}

impl Module for Generator {
    fn forward(&self, input: &Var) -> Result<Var> {
        let n = input.value().batch_size();
        let [c, h, w] = self.image_shape;
        self.network.forward(input)?.reshape(&[n, c, h, w])
    }

    fn named_parameters(&self) -> Vec<(String, &Var)> {
        self.network.named_parameters()
    }

    fn named_parameters_mut(&mut self) -> Vec<(String, &mut Var)> {
        self.network.named_parameters_mut()
    }
}

/// Scores images `[n, c, h, w]` with an unbounded realness value `[n, 1]`.
#[derive(Debug, Clone)]
pub struct Discriminator {
    network: Network,
    image_shape: ImageShape,
}

impl Discriminator {
    pub fn new(network: Network, image_shape: ImageShape) -> Result<Discriminator> {
        let pixels: usize = image_shape.iter().product();
        if network.input_size() != pixels || network.output_size() != 1 {
            return Err(GanError::Config(format!(
                "critic must map {} pixels to 1 score, got {} -> {}",
                pixels, network.input_size(), network.output_size()
            )));
        }
        Ok(Discriminator { network, image_shape })
    }

    pub fn image_shape(&self) -> ImageShape {
        self.image_shape
    }
}

impl Module for Discriminator {
    fn forward(&self, input: &Var) -> Result<Var> {
        if input.shape().len() != 4 || input.shape()[1..] != self.image_shape[..] {
            let mut expected = vec![input.value().batch_size()];
            expected.extend_from_slice(&self.image_shape);
            return Err(GanError::shape("critic input", input.shape(), &expected));
        }
        self.network.forward(&input.flatten_samples()?)
    }

    fn named_parameters(&self) -> Vec<(String, &Var)> {
        self.network.named_parameters()
    }

    fn named_parameters_mut(&mut self) -> Vec<(String, &mut Var)> {
        self.network.named_parameters_mut()
    }
}

/// Multi-layer perceptron shapes for a generator/critic pair.
///
/// The generator uses ReLU hidden layers and a Tanh output so samples live in
/// [-1, 1] like the normalized training images. The critic uses LeakyReLU
/// hidden layers and an identity output: WGAN scores are not probabilities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GanArchitecture {
    pub z_dim: usize,
    pub image_shape: ImageShape,
    pub generator_hidden: Vec<usize>,
    pub critic_hidden: Vec<usize>,
    pub leaky_slope: f64,
}

impl GanArchitecture {
    fn pixels(&self) -> usize {
        self.image_shape.iter().product()
    }

    pub fn generator_spec(&self) -> NetworkSpec {
        NetworkSpec {
            name: "generator".to_string(),
            layers: chain(
                self.z_dim,
                &self.generator_hidden,
                self.pixels(),
                ActivationFunction::ReLU,
                ActivationFunction::Tanh,
            ),
        }
    }

    pub fn critic_spec(&self) -> NetworkSpec {
        NetworkSpec {
            name: "discriminator".to_string(),
            layers: chain(
                self.pixels(),
                &self.critic_hidden,
                1,
                ActivationFunction::LeakyReLU { alpha: self.leaky_slope },
                ActivationFunction::Identity,
            ),
        }
    }

    pub fn build<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<(Generator, Discriminator)> {
        let generator = Generator::new(Network::from_spec(&self.generator_spec(), rng)?, self.image_shape)?;
        let discriminator = Discriminator::new(Network::from_spec(&self.critic_spec(), rng)?, self.image_shape)?;
        Ok((generator, discriminator))
    }
}

fn chain(
    input: usize,
    hidden: &[usize],
    output: usize,
    hidden_act: ActivationFunction,
    output_act: ActivationFunction,
) -> Vec<LayerSpec> {
    let mut layers = Vec::with_capacity(hidden.len() + 1);
    let mut input_size = input;
    for &size in hidden {
        layers.push(LayerSpec { size, input_size, activation: hidden_act });
        input_size = size;
    }
    layers.push(LayerSpec { size: output, input_size, activation: output_act });
    layers
}
