use serde::{Serialize, Deserialize};

/// Per-epoch training statistics emitted by `TrainingSession::run`.
///
/// When a `progress_tx` channel is configured in `SessionConfig`, the session
/// sends one `EpochStats` value at the end of every completed epoch, after
/// the epoch has been logged, sampled and (if due) checkpointed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpochStats {
    /// 1-based epoch number.
    pub epoch: usize,
    /// Last epoch of this run.
    pub total_epochs: usize,
    /// Generator loss of the epoch's final batch.
    pub g_loss: f64,
    /// Critic loss (penalty included) of the epoch's final batch.
    pub d_loss: f64,
    /// Whether a checkpoint was written after this epoch.
    pub checkpointed: bool,
    /// Wall-clock duration of this single epoch in milliseconds.
    pub elapsed_ms: u64,
}
