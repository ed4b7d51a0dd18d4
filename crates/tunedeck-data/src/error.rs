use thiserror::Error;

pub type DatasetResult<T> = std::result::Result<T, DatasetError>;

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("unsupported dataset file extension: {0}")]
    UnsupportedFormat(String),

    #[error("{format} validation failed: {reason}")]
    Validation { format: &'static str, reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl DatasetError {
    pub(crate) fn validation(format: &'static str, reason: impl Into<String>) -> Self {
        Self::Validation { format, reason: reason.into() }
    }
}
