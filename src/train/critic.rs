use rand::Rng;

use crate::autograd::Var;
use crate::error::{GanError, Result};
use crate::loss::gradient_penalty::gradient_penalty;
use crate::loss::wasserstein::WassersteinLoss;
use crate::math::tensor::Tensor;
use crate::network::module::Module;
use crate::optim::optimizer::Optimizer;

/// Runs `n_critic` critic updates against one batch of real images and
/// returns the total loss of the last update.
///
/// Every update draws fresh latent noise sized to the batch, generates fakes
/// outside the graph (the generator receives no gradient), and minimizes
/// `-mean(D(real)) + mean(D(fake)) + λ·penalty`. Only the discriminator's
/// parameters are stepped.
pub fn critic_step<G, D, O, R>(
    generator: &G,
    discriminator: &mut D,
    optim_d: &mut O,
    real: &Tensor,
    n_critic: usize,
    z_dim: usize,
    rng: &mut R,
) -> Result<f64>
where
    G: Module + ?Sized,
    D: Module + ?Sized,
    O: Optimizer + ?Sized,
    R: Rng + ?Sized,
{
    if n_critic == 0 {
        return Err(GanError::Config("n_critic must be at least 1".to_string()));
    }
    let batch_size = real.batch_size();
    let real_var = Var::constant(real.clone());

    let mut last_loss = 0.0;
    for _ in 0..n_critic {
        let noise = Var::constant(Tensor::randn(&[batch_size, z_dim], rng));
        let fake = generator.forward(&noise)?.detach();

        let real_loss = WassersteinLoss::real(&discriminator.forward(&real_var)?)?;
        let fake_loss = WassersteinLoss::fake(&discriminator.forward(&fake)?)?;
        let penalty = gradient_penalty(&*discriminator, real, fake.value(), rng)?;
        let total = WassersteinLoss::critic_total(&real_loss, &fake_loss, &penalty)?;

        let grads = total.backward()?;
        optim_d.step(discriminator.named_parameters_mut(), &grads)?;
        last_loss = total.to_scalar()?;
    }
    Ok(last_loss)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::gan::GanArchitecture;
    use crate::optim::adam::Adam;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn architecture() -> GanArchitecture {
        GanArchitecture {
            z_dim: 3,
            image_shape: [1, 2, 2],
            generator_hidden: vec![5],
            critic_hidden: vec![5],
            leaky_slope: 0.2,
        }
    }

    #[test]
    fn updates_only_the_critic() {
        let mut rng = StdRng::seed_from_u64(3);
        let (generator, mut critic) = architecture().build(&mut rng).unwrap();
        let mut optim = Adam::new(1e-2).betas(0.5, 0.9);
        let g_before = generator.state_dict();
        let d_before = critic.state_dict();

        let real = Tensor::randn(&[4, 1, 2, 2], &mut rng);
        let loss = critic_step(&generator, &mut critic, &mut optim, &real, 2, 3, &mut rng).unwrap();

        assert!(loss.is_finite());
        assert_eq!(generator.state_dict(), g_before);
        assert_ne!(critic.state_dict(), d_before);
        assert_eq!(optim.step_count(), 2);
    }

    #[test]
    fn zero_critic_iterations_are_rejected() {
        let mut rng = StdRng::seed_from_u64(4);
        let (generator, mut critic) = architecture().build(&mut rng).unwrap();
        let mut optim = Adam::new(1e-3);
        let real = Tensor::zeros(&[2, 1, 2, 2]);
        assert!(matches!(
            critic_step(&generator, &mut critic, &mut optim, &real, 0, 3, &mut rng),
            Err(GanError::Config(_))
        ));
    }

    #[test]
    fn accepts_a_single_image_batch() {
        let mut rng = StdRng::seed_from_u64(5);
        let (generator, mut critic) = architecture().build(&mut rng).unwrap();
        let mut optim = Adam::new(1e-3);
        let real = Tensor::randn(&[1, 1, 2, 2], &mut rng);
        assert!(critic_step(&generator, &mut critic, &mut optim, &real, 1, 3, &mut rng).is_ok());
    }
}
