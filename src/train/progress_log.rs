use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Local;

use crate::error::Result;

/// Append-only per-epoch text log.
#[derive(Debug, Clone)]
pub struct ProgressLog {
    path: PathBuf,
}

impl ProgressLog {
    pub fn new(path: impl Into<PathBuf>) -> ProgressLog {
        ProgressLog { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends one timestamped line and returns it without the timestamp.
    pub fn append(&self, epoch: usize, total_epochs: usize, g_loss: f64, d_loss: f64) -> Result<String> {
        let message = format_epoch_line(epoch, total_epochs, g_loss, d_loss);
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        writeln!(file, "[{}] {}", Local::now().format("%Y-%m-%d %H:%M:%S"), message)?;
        Ok(message)
    }
}

pub fn format_epoch_line(epoch: usize, total_epochs: usize, g_loss: f64, d_loss: f64) -> String {
    format!("Epoch {epoch}/{total_epochs}, g_loss: {g_loss}, d_loss: {d_loss}")
}
