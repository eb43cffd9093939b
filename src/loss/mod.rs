pub mod gradient_penalty;
pub mod wasserstein;

pub use gradient_penalty::{gradient_penalty, gradient_penalty_with_alpha};
pub use wasserstein::{WassersteinLoss, LAMBDA_GP};
