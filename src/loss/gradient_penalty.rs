use rand::Rng;

use crate::autograd::{grad, Var};
use crate::error::{GanError, Result};
use crate::math::tensor::Tensor;
use crate::network::module::Module;

/// Added under the square root of the gradient norm so an all-zero gradient
/// stays differentiable.
pub const NORM_EPSILON: f64 = 1e-12;

/// WGAN-GP regularizer: `mean((|∇D(x̂)| - 1)²)` over random interpolates
/// `x̂ = α·real + (1 - α)·fake`, one `α ~ U[0, 1]` per sample.
///
/// The result is a graph node: back-propagating it reaches the critic's
/// parameters through the gradient itself (second-order differentiation).
/// `fake` is used as a constant. `real` and `fake` must have the same shape.
pub fn gradient_penalty<M, R>(discriminator: &M, real: &Tensor, fake: &Tensor, rng: &mut R) -> Result<Var>
where
    M: Module + ?Sized,
    R: Rng + ?Sized,
{
    check_pair(real, fake)?;
    // Sized from this batch, so a ragged final batch is fine.
    let alpha = Tensor::rand_uniform(&[real.batch_size()], rng);
    gradient_penalty_with_alpha(discriminator, real, fake, &alpha)
}

/// [`gradient_penalty`] with caller-chosen interpolation coefficients, one
/// per sample.
pub fn gradient_penalty_with_alpha<M>(discriminator: &M, real: &Tensor, fake: &Tensor, alpha: &Tensor) -> Result<Var>
where
    M: Module + ?Sized,
{
    check_pair(real, fake)?;
    let n = real.batch_size();
    if alpha.numel() != n {
        return Err(GanError::shape("gradient_penalty alpha", alpha.shape(), &[n]));
    }

    let per_sample = real.numel() / n;
    let mixed: Vec<f64> = real.data().chunks(per_sample)
        .zip(fake.data().chunks(per_sample))
        .zip(alpha.data())
        .flat_map(|((r, f), &a)| r.iter().zip(f).map(move |(&r, &f)| a * r + (1.0 - a) * f))
        .collect();
    let interpolated = Var::variable(Tensor::new(real.shape().to_vec(), mixed)?);

    let score = discriminator.forward(&interpolated)?;
    let gradients = grad(&score, &[&interpolated], true)?
        .pop()
        .ok_or_else(|| GanError::Autograd("no gradient for interpolated batch".to_string()))?;

    let norm = gradients
        .flatten_samples()?
        .square()?
        .sum_cols()?
        .add_scalar(NORM_EPSILON)
        .sqrt();
    norm.add_scalar(-1.0).square()?.mean()
}

fn check_pair(real: &Tensor, fake: &Tensor) -> Result<()> {
    if real.shape() != fake.shape() {
        return Err(GanError::shape("gradient_penalty", real.shape(), fake.shape()));
    }
    if real.batch_size() == 0 || real.numel() == 0 {
        return Err(GanError::shape("gradient_penalty", real.shape(), &[1]));
    }
    Ok(())
}
