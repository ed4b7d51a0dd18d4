use thiserror::Error;
use tunedeck_data::DatasetId;

pub type TrainingResult<T> = std::result::Result<T, TrainingError>;

#[derive(Debug, Error)]
pub enum TrainingError {
    #[error("dataset {dataset_id} is not ready for training: {reason}")]
    DatasetNotReady { dataset_id: DatasetId, reason: String },

    #[error("invalid training parameters: {0}")]
    InvalidParameters(String),

    #[error("invalid simulator config: {0}")]
    Config(String),
}

impl TrainingError {
    pub(crate) fn not_ready(dataset_id: &DatasetId, reason: impl Into<String>) -> Self {
        Self::DatasetNotReady { dataset_id: dataset_id.clone(), reason: reason.into() }
    }
}
