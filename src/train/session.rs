use std::fs;
use std::time::Instant;

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Serialize, Deserialize};

use crate::autograd::Var;
use crate::checkpoint::{CheckpointRecord, CheckpointStore};
use crate::data::loader::DataSource;
use crate::error::{GanError, Result};
use crate::math::tensor::Tensor;
use crate::sample::{sample_file_name, save_image_grid};
use crate::train::epoch::{run_epoch, Adversaries};
use crate::train::epoch_stats::EpochStats;
use crate::train::progress_log::ProgressLog;
use crate::train::train_config::SessionConfig;

/// Per-epoch losses, oldest first. Entry `i` belongs to epoch `i + 1`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LossHistory {
    pub generator: Vec<f64>,
    pub critic: Vec<f64>,
}

impl LossHistory {
    pub fn len(&self) -> usize {
        self.generator.len()
    }

    pub fn is_empty(&self) -> bool {
        self.generator.is_empty()
    }
}

/// Where a session starts: first epoch to run and the history so far.
#[derive(Debug, Clone, PartialEq)]
pub struct Resume {
    pub start_epoch: usize,
    pub history: LossHistory,
}

impl Resume {
    pub fn cold_start() -> Resume {
        Resume { start_epoch: 1, history: LossHistory::default() }
    }

    /// Restores both models and optimizers from `store` and resumes after the
    /// saved epoch. Falls back to a cold start when no checkpoint exists (or,
    /// with `tolerate_corrupt`, when it cannot be read).
    pub fn from_checkpoint(
        store: &CheckpointStore,
        models: &mut Adversaries<'_>,
        tolerate_corrupt: bool,
    ) -> Result<Resume> {
        let Some(record) = store.load_or_cold_start(tolerate_corrupt)? else {
            tracing::info!("No checkpoint at '{}', starting from epoch 1", store.path().display());
            return Ok(Resume::cold_start());
        };

        if record.losses_g.len() != record.losses_d.len() {
            return Err(GanError::CheckpointCorrupt {
                path: store.path().to_path_buf(),
                reason: format!(
                    "{} generator losses but {} critic losses",
                    record.losses_g.len(),
                    record.losses_d.len()
                ),
            });
        }

        models.generator.load_state_dict(&record.generator)?;
        models.discriminator.load_state_dict(&record.discriminator)?;
        models.optim_g.load_state_dict(&record.optimizer_g)?;
        models.optim_d.load_state_dict(&record.optimizer_d)?;

        tracing::info!("Resuming from checkpoint at epoch {}", record.epoch);
        Ok(Resume {
            start_epoch: record.epoch + 1,
            history: LossHistory { generator: record.losses_g, critic: record.losses_d },
        })
    }
}

/// Drives epochs from the resume point to `num_epochs`, logging, sampling
/// and checkpointing after each one.
pub struct TrainingSession<'a> {
    models: Adversaries<'a>,
    data: &'a mut dyn DataSource,
    config: SessionConfig,
    start_epoch: usize,
    history: LossHistory,
    fixed_noise: Tensor,
    rng: StdRng,
    log: ProgressLog,
    store: CheckpointStore,
}

impl<'a> TrainingSession<'a> {
    /// Validates `config` and draws the fixed sampling noise once.
    pub fn new(
        models: Adversaries<'a>,
        data: &'a mut dyn DataSource,
        config: SessionConfig,
        resume: Resume,
    ) -> Result<TrainingSession<'a>> {
        config.validate()?;
        if resume.start_epoch == 0 {
            return Err(GanError::Config("epochs are numbered from 1".to_string()));
        }

        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let fixed_noise = Tensor::randn(&[config.sample_size, config.z_dim], &mut rng);

        Ok(TrainingSession {
            models,
            data,
            log: ProgressLog::new(&config.log_path),
            store: CheckpointStore::new(&config.checkpoint_path),
            start_epoch: resume.start_epoch,
            history: resume.history,
            fixed_noise,
            rng,
            config,
        })
    }

    pub fn fixed_noise(&self) -> &Tensor {
        &self.fixed_noise
    }

    /// Runs the remaining epochs and returns the full loss history.
    pub fn run(mut self) -> Result<LossHistory> {
        let mut history = std::mem::take(&mut self.history);
        let total = self.config.num_epochs;
        if self.start_epoch > total {
            tracing::info!("Nothing to do: epoch {} is past the last epoch {}", self.start_epoch, total);
            return Ok(history);
        }
        fs::create_dir_all(&self.config.sample_dir)?;

        for epoch in self.start_epoch..=total {
            let started = Instant::now();
            let losses = run_epoch(
                &mut self.models,
                &mut *self.data,
                self.config.n_critic,
                self.config.z_dim,
                self.config.show_progress,
                &mut self.rng,
            )?;

            let line = self.log.append(epoch, total, losses.g_loss, losses.d_loss)?;
            tracing::info!("{line}");
            history.generator.push(losses.g_loss);
            history.critic.push(losses.d_loss);

            self.save_samples(epoch)?;

            let checkpointed = epoch % self.config.save_model_at == 0;
            if checkpointed {
                self.store.save(&self.record(epoch, &history))?;
            }

            if let Some(tx) = &self.config.progress_tx {
                // A closed receiver only means nobody is watching.
                let _ = tx.send(EpochStats {
                    epoch,
                    total_epochs: total,
                    g_loss: losses.g_loss,
                    d_loss: losses.d_loss,
                    checkpointed,
                    elapsed_ms: started.elapsed().as_millis() as u64,
                });
            }
        }
        Ok(history)
    }

    fn save_samples(&self, epoch: usize) -> Result<()> {
        let samples = self.models.generator.forward(&Var::constant(self.fixed_noise.clone()))?;
        let path = self.config.sample_dir.join(sample_file_name(epoch));
        save_image_grid(samples.value(), &path)?;
        tracing::debug!("Saved samples to '{}'", path.display());
        Ok(())
    }

    fn record(&self, epoch: usize, history: &LossHistory) -> CheckpointRecord {
        CheckpointRecord {
            epoch,
            generator: self.models.generator.state_dict(),
            discriminator: self.models.discriminator.state_dict(),
            optimizer_g: self.models.optim_g.state_dict(),
            optimizer_d: self.models.optim_d.state_dict(),
            losses_g: history.generator.clone(),
            losses_d: history.critic.clone(),
        }
    }
}
