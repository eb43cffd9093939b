use std::fs;
use std::path::{Path, PathBuf};

use serde::{Serialize, Deserialize};

use crate::error::{GanError, Result};
use crate::network::gan::GanArchitecture;
use crate::optim::adam::Adam;
use crate::train::train_config::SessionConfig;

/// Output directories of a training run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Directories {
    /// Loss history exports.
    pub plots: PathBuf,
    pub samples: PathBuf,
    /// Holds `checkpoint.json`.
    pub weights: PathBuf,
    /// Holds `training.log`.
    pub logs: PathBuf,
}

/// Training parameters read from a JSON file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainParams {
    #[serde(default)]
    pub seed: Option<u64>,
    pub directories: Directories,
    pub dataset_dir: PathBuf,
    pub image_size: u32,
    pub channels: usize,
    pub batch_size: usize,
    pub z_dim: usize,
    pub generator_hidden: Vec<usize>,
    pub critic_hidden: Vec<usize>,
    /// LeakyReLU slope of the critic.
    pub alpha: f64,
    pub lr_g: f64,
    pub lr_d: f64,
    pub g_betas: (f64, f64),
    pub d_betas: (f64, f64),
    pub n_critic: usize,
    pub sample_size: usize,
    pub num_epochs: usize,
    pub save_model_at: usize,
    #[serde(default = "default_shuffle")]
    pub shuffle: bool,
    #[serde(default)]
    pub tolerate_corrupt_checkpoint: bool,
}

fn default_shuffle() -> bool {
    true
}

impl TrainParams {
    pub fn load(path: impl AsRef<Path>) -> Result<TrainParams> {
        let json = fs::read_to_string(path)?;
        let params: TrainParams = serde_json::from_str(&json)?;
        params.validate()?;
        Ok(params)
    }

    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("image_size", self.image_size as usize),
            ("batch_size", self.batch_size),
            ("z_dim", self.z_dim),
            ("n_critic", self.n_critic),
            ("sample_size", self.sample_size),
            ("save_model_at", self.save_model_at),
        ] {
            if value == 0 {
                return Err(GanError::Config(format!("{name} must be at least 1")));
            }
        }
        if self.channels != 1 && self.channels != 3 {
            return Err(GanError::Config(format!("channels must be 1 or 3, got {}", self.channels)));
        }
        if !self.alpha.is_finite() || self.alpha < 0.0 {
            return Err(GanError::Config(format!("alpha must be a finite slope >= 0, got {}", self.alpha)));
        }
        for (name, lr) in [("lr_g", self.lr_g), ("lr_d", self.lr_d)] {
            if !lr.is_finite() || lr <= 0.0 {
                return Err(GanError::Config(format!("{name} must be finite and > 0, got {lr}")));
            }
        }
        Ok(())
    }

    /// Creates every output directory that does not exist yet.
    pub fn create_dirs(&self) -> Result<()> {
        let d = &self.directories;
        for dir in [&d.plots, &d.samples, &d.weights, &d.logs] {
            fs::create_dir_all(dir)?;
        }
        Ok(())
    }

    pub fn checkpoint_path(&self) -> PathBuf {
        self.directories.weights.join("checkpoint.json")
    }

    pub fn log_path(&self) -> PathBuf {
        self.directories.logs.join("training.log")
    }

    pub fn losses_path(&self) -> PathBuf {
        self.directories.plots.join("losses.json")
    }

    /// Writes `generator.json` and `discriminator.json` layer specs into the
    /// weights directory and returns their paths.
    pub fn save_architecture(&self) -> Result<Vec<PathBuf>> {
        let arch = self.architecture();
        let mut paths = Vec::with_capacity(2);
        for spec in [arch.generator_spec(), arch.critic_spec()] {
            let path = self.directories.weights.join(format!("{}.json", spec.name));
            spec.save_json(&path)?;
            paths.push(path);
        }
        Ok(paths)
    }

    pub fn architecture(&self) -> GanArchitecture {
        let size = self.image_size as usize;
        GanArchitecture {
            z_dim: self.z_dim,
            image_shape: [self.channels, size, size],
            generator_hidden: self.generator_hidden.clone(),
            critic_hidden: self.critic_hidden.clone(),
            leaky_slope: self.alpha,
        }
    }

    /// `(generator, critic)` optimizers.
    pub fn optimizers(&self) -> (Adam, Adam) {
        (
            Adam::new(self.lr_g).betas(self.g_betas.0, self.g_betas.1),
            Adam::new(self.lr_d).betas(self.d_betas.0, self.d_betas.1),
        )
    }

    pub fn session_config(&self, show_progress: bool) -> SessionConfig {
        let mut config = SessionConfig::new(
            self.num_epochs,
            &self.directories.samples,
            self.log_path(),
            self.checkpoint_path(),
        );
        config.n_critic = self.n_critic;
        config.sample_size = self.sample_size;
        config.z_dim = self.z_dim;
        config.save_model_at = self.save_model_at;
        config.seed = self.seed;
        config.show_progress = show_progress;
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::spec::NetworkSpec;

    const PARAMS: &str = r#"{
        "seed": 42,
        "directories": { "plots": "out/plots", "samples": "out/samples", "weights": "out/weights", "logs": "out/logs" },
        "dataset_dir": "data/faces",
        "image_size": 8,
        "channels": 1,
        "batch_size": 16,
        "z_dim": 100,
        "generator_hidden": [128, 256],
        "critic_hidden": [256, 128],
        "alpha": 0.2,
        "lr_g": 0.0001,
        "lr_d": 0.0001,
        "g_betas": [0.0, 0.9],
        "d_betas": [0.0, 0.9],
        "n_critic": 5,
        "sample_size": 64,
        "num_epochs": 10,
        "save_model_at": 2
    }"#;

    #[test]
    fn parses_with_defaults() {
        let params: TrainParams = serde_json::from_str(PARAMS).unwrap();
        assert!(params.validate().is_ok());
        assert!(params.shuffle);
        assert!(!params.tolerate_corrupt_checkpoint);
        assert_eq!(params.checkpoint_path(), PathBuf::from("out/weights/checkpoint.json"));

        let arch = params.architecture();
        assert_eq!(arch.image_shape, [1, 8, 8]);
        assert_eq!(arch.critic_spec().layers.last().map(|l| l.size), Some(1));

        let config = params.session_config(false);
        assert_eq!(config.n_critic, 5);
        assert_eq!(config.save_model_at, 2);
        assert_eq!(config.seed, Some(42));
        assert_eq!(config.log_path, PathBuf::from("out/logs/training.log"));
    }

    #[test]
    fn rejects_bad_values() {
        let mut params: TrainParams = serde_json::from_str(PARAMS).unwrap();
        params.channels = 2;
        assert!(params.validate().is_err());

        let mut params: TrainParams = serde_json::from_str(PARAMS).unwrap();
        params.n_critic = 0;
        assert!(matches!(params.validate(), Err(GanError::Config(msg)) if msg.contains("n_critic")));
    }

    #[test]
    fn load_and_create_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let mut params: TrainParams = serde_json::from_str(PARAMS).unwrap();
        params.directories = Directories {
            plots: dir.path().join("plots"),
            samples: dir.path().join("samples"),
            weights: dir.path().join("weights"),
            logs: dir.path().join("logs"),
        };
        let path = dir.path().join("parameters.json");
        fs::write(&path, serde_json::to_string_pretty(&params).unwrap()).unwrap();

        let loaded = TrainParams::load(&path).unwrap();
        assert_eq!(loaded, params);
        loaded.create_dirs().unwrap();
        assert!(dir.path().join("weights").is_dir());
        assert!(dir.path().join("logs").is_dir());

        let paths = loaded.save_architecture().unwrap();
        assert_eq!(paths, [dir.path().join("weights").join("generator.json"), dir.path().join("weights").join("discriminator.json")]);
        let critic = NetworkSpec::load_json(&paths[1]).unwrap();
        assert_eq!(critic, loaded.architecture().critic_spec());
        assert_eq!(critic.input_size(), 64);
    }
}
