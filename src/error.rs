use std::path::PathBuf;

/// Library error type.
#[derive(Debug, thiserror::Error)]
pub enum GanError {
    #[error("shape mismatch in {op}: {lhs:?} vs {rhs:?}")]
    Shape {
        op: &'static str,
        lhs: Vec<usize>,
        rhs: Vec<usize>,
    },

    #[error("autograd error: {0}")]
    Autograd(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("data source produced no batches")]
    EmptyDataset,

    #[error("checkpoint '{}' is not readable: {reason}", path.display())]
    CheckpointCorrupt { path: PathBuf, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("progress bar template error: {0}")]
    Progress(#[from] indicatif::style::TemplateError),
}

impl GanError {
    pub(crate) fn shape(op: &'static str, lhs: &[usize], rhs: &[usize]) -> Self {
        GanError::Shape {
            op,
            lhs: lhs.to_vec(),
            rhs: rhs.to_vec(),
        }
    }
}

pub type Result<T> = std::result::Result<T, GanError>;
