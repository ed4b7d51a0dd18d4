use thiserror::Error;
use tunedeck_training::JobStatus;

pub type ExportResult<T> = std::result::Result<T, ExportError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExportError {
    #[error("training must be completed before exporting the model (job is {status})")]
    NotCompleted { status: JobStatus },

    #[error("unknown export format: {0}")]
    UnknownFormat(String),

    #[error("unknown deployment target: {0}")]
    UnknownTarget(String),

    #[error("not connected to {target}, connect your account first")]
    NotConnected { target: String },
}
