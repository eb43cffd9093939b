use std::path::PathBuf;
use std::sync::mpsc;

use crate::error::{GanError, Result};
use crate::train::epoch_stats::EpochStats;

/// Configuration for a `TrainingSession` run.
///
/// # Fields
/// - `n_critic`:        critic updates per generator update, at least 1
/// - `sample_size`:     number of images in every per-epoch sample grid
/// - `z_dim`:           latent noise width fed to the generator
/// - `num_epochs`:      last epoch to run (inclusive, 1-based)
/// - `save_model_at`:   a checkpoint is written when `epoch % save_model_at == 0`
/// - `sample_dir`:      directory receiving `fake_samples_epoch_*.jpeg`
/// - `log_path`:        append-only text log, one line per epoch
/// - `checkpoint_path`: JSON checkpoint file, replaced atomically
/// - `seed`:            seeds latent noise, penalty mixing and fixed noise;
///                      `None` draws from OS entropy
/// - `show_progress`:   draw a per-batch progress bar on stderr
/// - `progress_tx`:     optional channel sender; one `EpochStats` is sent per
///                      completed epoch. A dropped receiver is ignored.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub n_critic: usize,
    pub sample_size: usize,
    pub z_dim: usize,
    pub num_epochs: usize,
    pub save_model_at: usize,
    pub sample_dir: PathBuf,
    pub log_path: PathBuf,
    pub checkpoint_path: PathBuf,
    pub seed: Option<u64>,
    pub show_progress: bool,
    pub progress_tx: Option<mpsc::Sender<EpochStats>>,
}

impl SessionConfig {
    /// Defaults of the reference WGAN-GP setup: 5 critic steps, 64 samples,
    /// 100-dimensional noise, a checkpoint every epoch, no progress channel.
    pub fn new(
        num_epochs: usize,
        sample_dir: impl Into<PathBuf>,
        log_path: impl Into<PathBuf>,
        checkpoint_path: impl Into<PathBuf>,
    ) -> Self {
        SessionConfig {
            n_critic: 5,
            sample_size: 64,
            z_dim: 100,
            num_epochs,
            save_model_at: 1,
            sample_dir: sample_dir.into(),
            log_path: log_path.into(),
            checkpoint_path: checkpoint_path.into(),
            seed: None,
            show_progress: false,
            progress_tx: None,
        }
    }

    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("n_critic", self.n_critic),
            ("sample_size", self.sample_size),
            ("z_dim", self.z_dim),
            ("save_model_at", self.save_model_at),
        ] {
            if value == 0 {
                return Err(GanError::Config(format!("{name} must be at least 1")));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = SessionConfig::new(3, "samples", "log.txt", "checkpoint.json");
        assert_eq!(config.n_critic, 5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn zero_counts_are_rejected() {
        let mut config = SessionConfig::new(3, "samples", "log.txt", "checkpoint.json");
        config.save_model_at = 0;
        assert!(matches!(config.validate(), Err(GanError::Config(msg)) if msg.contains("save_model_at")));
    }
}
