use indicatif::{ProgressBar, ProgressStyle};
use rand::Rng;

use crate::data::loader::DataSource;
use crate::error::{GanError, Result};
use crate::network::module::Module;
use crate::optim::optimizer::Optimizer;
use crate::train::critic::critic_step;
use crate::train::generator::generator_step;

/// The two models under training and their optimizers, lent by the caller.
pub struct Adversaries<'a> {
    pub generator: &'a mut dyn Module,
    pub discriminator: &'a mut dyn Module,
    pub optim_g: &'a mut dyn Optimizer,
    pub optim_d: &'a mut dyn Optimizer,
}

/// Losses reported for one epoch: those of its final batch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EpochLosses {
    pub g_loss: f64,
    pub d_loss: f64,
}

/// One full pass over `data`: for every batch, `n_critic` critic updates on
/// the batch followed by one generator update of the same size.
pub fn run_epoch<R: Rng + ?Sized>(
    models: &mut Adversaries<'_>,
    data: &mut dyn DataSource,
    n_critic: usize,
    z_dim: usize,
    show_progress: bool,
    rng: &mut R,
) -> Result<EpochLosses> {
    let bar = if show_progress {
        let bar = ProgressBar::new(data.num_batches() as u64);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}")?
                .progress_chars("#>-"),
        );
        bar
    } else {
        ProgressBar::hidden()
    };

    let mut last = None;
    for batch in data.batches() {
        let batch = batch?;
        let batch_size = batch.images.batch_size();

        let d_loss = critic_step(
            &*models.generator,
            &mut *models.discriminator,
            &mut *models.optim_d,
            &batch.images,
            n_critic,
            z_dim,
            rng,
        )?;
        let g_loss = generator_step(
            &mut *models.generator,
            &*models.discriminator,
            &mut *models.optim_g,
            batch_size,
            z_dim,
            rng,
        )?;

        bar.set_message(format!("g_loss: {g_loss:.4}, d_loss: {d_loss:.4}"));
        bar.inc(1);
        last = Some(EpochLosses { g_loss, d_loss });
    }
    bar.finish_and_clear();

    last.ok_or(GanError::EmptyDataset)
}
