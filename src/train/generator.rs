use rand::Rng;

use crate::autograd::Var;
use crate::error::{GanError, Result};
use crate::loss::wasserstein::WassersteinLoss;
use crate::math::tensor::Tensor;
use crate::network::module::Module;
use crate::optim::optimizer::Optimizer;

/// One generator update: `-mean(D(G(z)))` on fresh noise, stepping only the
/// generator's parameters. Returns the loss.
pub fn generator_step<G, D, O, R>(
    generator: &mut G,
    discriminator: &D,
    optim_g: &mut O,
    batch_size: usize,
    z_dim: usize,
    rng: &mut R,
) -> Result<f64>
where
    G: Module + ?Sized,
    D: Module + ?Sized,
    O: Optimizer + ?Sized,
    R: Rng + ?Sized,
{
    if batch_size == 0 {
        return Err(GanError::Config("generator batch size must be at least 1".to_string()));
    }
    let noise = Var::constant(Tensor::randn(&[batch_size, z_dim], rng));
    let fake = generator.forward(&noise)?;
    let g_loss = WassersteinLoss::generator(&discriminator.forward(&fake)?)?;

    // The gradients also cover the critic; only the generator consumes them.
    let grads = g_loss.backward()?;
    optim_g.step(generator.named_parameters_mut(), &grads)?;
    g_loss.to_scalar()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::gan::GanArchitecture;
    use crate::optim::adam::Adam;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn updates_only_the_generator() {
        let mut rng = StdRng::seed_from_u64(8);
        let arch = GanArchitecture {
            z_dim: 4,
            image_shape: [1, 3, 3],
            generator_hidden: vec![6],
            critic_hidden: vec![6],
            leaky_slope: 0.2,
        };
        let (mut generator, critic) = arch.build(&mut rng).unwrap();
        let mut optim = Adam::new(1e-2);
        let g_before = generator.state_dict();
        let d_before = critic.state_dict();

        let loss = generator_step(&mut generator, &critic, &mut optim, 5, 4, &mut rng).unwrap();

        assert!(loss.is_finite());
        assert_eq!(critic.state_dict(), d_before);
        assert_ne!(generator.state_dict(), g_before);
    }
}
