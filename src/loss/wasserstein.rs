use crate::autograd::Var;
use crate::error::Result;

/// Weight of the gradient penalty in the critic objective.
pub const LAMBDA_GP: f64 = 10.0;

/// Wasserstein critic and generator objectives on raw (unsquashed) scores.
pub struct WassersteinLoss;

impl WassersteinLoss {
    /// Critic loss on real images: -mean(score). Minimizing it raises the
    /// scores of real samples.
    pub fn real(score: &Var) -> Result<Var> {
        Ok(score.mean()?.neg())
    }

    /// Critic loss on generated images: mean(score).
    pub fn fake(score: &Var) -> Result<Var> {
        score.mean()
    }

    /// Generator loss: -mean(score of its own samples).
    pub fn generator(score: &Var) -> Result<Var> {
        Ok(score.mean()?.neg())
    }

    /// `real + fake + LAMBDA_GP * penalty`
    pub fn critic_total(real: &Var, fake: &Var, penalty: &Var) -> Result<Var> {
        real.add(fake)?.add(&penalty.scale(LAMBDA_GP))
    }
}
