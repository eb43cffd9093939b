use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::{Serialize, Deserialize};

use crate::error::{GanError, Result};
use crate::network::module::StateDict;
use crate::optim::optimizer::OptimizerState;

/// Everything needed to resume training after a completed epoch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointRecord {
    /// Last completed epoch; a resumed run starts at `epoch + 1`.
    pub epoch: usize,
    pub generator: StateDict,
    pub discriminator: StateDict,
    pub optimizer_g: OptimizerState,
    pub optimizer_d: OptimizerState,
    pub losses_g: Vec<f64>,
    pub losses_d: Vec<f64>,
}

/// A single JSON checkpoint file that is replaced atomically on save.
#[derive(Debug, Clone)]
pub struct CheckpointStore {
    path: PathBuf,
}

impl CheckpointStore {
    pub fn new(path: impl Into<PathBuf>) -> CheckpointStore {
        CheckpointStore { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_os_string();
        name.push(".tmp");
        PathBuf::from(name)
    }

    /// Writes `record` next to the target and renames it into place, so a
    /// crash mid-write leaves the previous checkpoint intact.
    pub fn save(&self, record: &CheckpointRecord) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let tmp = self.tmp_path();
        if let Err(e) = write_synced(&tmp, record).and_then(|()| fs::rename(&tmp, &self.path).map_err(GanError::from)) {
            let _ = fs::remove_file(&tmp);
            return Err(e);
        }

        tracing::debug!("Saved checkpoint for epoch {} to '{}'", record.epoch, self.path.display());
        Ok(())
    }

    /// `Ok(None)` when no checkpoint exists yet.
    pub fn load(&self) -> Result<Option<CheckpointRecord>> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(self.corrupt(e.to_string())),
        };
        serde_json::from_reader(BufReader::new(file))
            .map(Some)
            .map_err(|e| self.corrupt(e.to_string()))
    }

    /// Like [`load`](Self::load), but treats an unreadable checkpoint as
    /// absent when `tolerate_corrupt` is set.
    pub fn load_or_cold_start(&self, tolerate_corrupt: bool) -> Result<Option<CheckpointRecord>> {
        match self.load() {
            Err(GanError::CheckpointCorrupt { reason, .. }) if tolerate_corrupt => {
                tracing::warn!(
                    "Ignoring unreadable checkpoint '{}' ({reason}); starting from scratch",
                    self.path.display()
                );
                Ok(None)
            }
            other => other,
        }
    }

    fn corrupt(&self, reason: String) -> GanError {
        GanError::CheckpointCorrupt { path: self.path.clone(), reason }
    }
}

fn write_synced(path: &Path, record: &CheckpointRecord) -> Result<()> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer(&mut writer, record)?;
    writer.flush()?;
    writer.get_ref().sync_all()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::tensor::Tensor;
    use crate::optim::adam::Adam;
    use crate::optim::optimizer::Optimizer;

    fn record(epoch: usize) -> CheckpointRecord {
        let mut generator = StateDict::new();
        generator.insert("layers.0.weights".into(), Tensor::new(vec![1, 3], vec![0.1, -0.2, 1.0 / 3.0]).unwrap());
        let mut discriminator = StateDict::new();
        discriminator.insert("layers.0.biases".into(), Tensor::full(&[1, 1], 0.7));
        CheckpointRecord {
            epoch,
            generator,
            discriminator,
            optimizer_g: Adam::new(1e-4).state_dict(),
            optimizer_d: Adam::new(2e-4).betas(0.5, 0.9).state_dict(),
            losses_g: vec![0.1 + 0.2, -1.5],
            losses_d: vec![std::f64::consts::PI, 2.0],
        }
    }

    #[test]
    fn save_then_load_is_exact() {
        let dir = tempfile::tempdir().unwrap();
        let store = CheckpointStore::new(dir.path().join("weights").join("checkpoint.json"));
        let saved = record(2);
        store.save(&saved).unwrap();
        assert_eq!(store.load().unwrap(), Some(saved));
    }

    #[test]
    fn save_replaces_previous_record_without_leftovers() {
        let dir = tempfile::tempdir().unwrap();
        let store = CheckpointStore::new(dir.path().join("checkpoint.json"));
        store.save(&record(1)).unwrap();
        store.save(&record(4)).unwrap();
        assert_eq!(store.load().unwrap().unwrap().epoch, 4);
        assert!(!store.tmp_path().exists());
    }

    #[test]
    fn failed_save_cleans_up_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        // A directory in the target's place makes the final rename fail.
        let path = dir.path().join("checkpoint.json");
        fs::create_dir(&path).unwrap();
        fs::write(path.join("keep"), "x").unwrap();
        let store = CheckpointStore::new(&path);

        assert!(matches!(store.save(&record(1)), Err(GanError::Io(_))));
        assert!(!store.tmp_path().exists());
        assert!(path.join("keep").exists());
    }

    #[test]
    fn missing_file_means_cold_start() {
        let dir = tempfile::tempdir().unwrap();
        let store = CheckpointStore::new(dir.path().join("nothing.json"));
        assert_eq!(store.load().unwrap(), None);
        assert_eq!(store.load_or_cold_start(false).unwrap(), None);
    }

    #[test]
    fn corrupt_file_is_an_error_unless_tolerated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("checkpoint.json");
        fs::write(&path, "{ \"epoch\": 3, \"generator\": ").unwrap();
        let store = CheckpointStore::new(&path);

        assert!(matches!(store.load(), Err(GanError::CheckpointCorrupt { .. })));
        assert!(store.load_or_cold_start(false).is_err());
        assert_eq!(store.load_or_cold_start(true).unwrap(), None);
    }
}
