//! In-memory dataset store.
//!
//! Uploaded files are sniffed by extension, validated, and kept for the lifetime of the
//! process. Validation failures never surface as errors: they are recorded on the
//! dataset itself (`status = Error` plus a message) so callers can render them.

use crate::error::DatasetResult;
use crate::format::DatasetFormat;
use crate::record::{DatasetId, DatasetRecord, DatasetStats, DatasetStatus};
use async_trait::async_trait;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Read-only dataset lookup consumed by the training core.
#[async_trait]
pub trait DatasetProvider: Send + Sync {
    async fn get_dataset(&self, id: &DatasetId) -> Option<DatasetRecord>;
}

/// Store for uploaded datasets, in upload order.
#[derive(Clone, Default)]
pub struct DatasetStore {
    datasets: Arc<RwLock<Vec<DatasetRecord>>>,
}

impl fmt::Debug for DatasetStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatasetStore")
            .field("dataset_count", &self.datasets.try_read().map(|d| d.len()).unwrap_or(0))
            .finish_non_exhaustive()
    }
}

impl DatasetStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate an uploaded file and store the outcome.
    ///
    /// The record passes through `Uploading` and `Validating` before landing on
    /// `Success` or `Error`.
    pub async fn process_file(&self, name: &str, content: &str) -> DatasetRecord {
        let mut record = DatasetRecord::uploading(name, content.len() as u64);
        let id = record.id.clone();
        debug!(dataset_id = %id, name, "Dataset upload started");
        self.datasets.write().await.push(record.clone());

        record.status = DatasetStatus::Validating;
        self.update(record.clone()).await;

        match DatasetFormat::from_file_name(name).and_then(|format| format.parse(content)) {
            Ok(parsed) => {
                info!(dataset_id = %id, name, examples = parsed.len(), "Dataset validated");
                record.status = DatasetStatus::Success;
                record.content = Some(parsed);
            }
            Err(e) => {
                warn!(dataset_id = %id, name, error = %e, "Dataset validation failed");
                record.status = DatasetStatus::Error;
                record.error = Some(e.to_string());
            }
        }

        self.update(record.clone()).await;
        record
    }

    /// Read a file from disk and process it like an upload.
    pub async fn process_path(&self, path: &Path) -> DatasetResult<DatasetRecord> {
        let content = tokio::fs::read_to_string(path).await?;
        let name = path.file_name().map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned());
        Ok(self.process_file(&name, &content).await)
    }

    pub async fn get(&self, id: &DatasetId) -> Option<DatasetRecord> {
        self.datasets.read().await.iter().find(|d| &d.id == id).cloned()
    }

    pub async fn list(&self) -> Vec<DatasetRecord> {
        self.datasets.read().await.clone()
    }

    /// Replace the stored record with the same id. Unknown ids are ignored.
    pub async fn update(&self, record: DatasetRecord) -> DatasetRecord {
        let mut datasets = self.datasets.write().await;
        if let Some(slot) = datasets.iter_mut().find(|d| d.id == record.id) {
            *slot = record.clone();
        }
        record
    }

    pub async fn remove(&self, id: &DatasetId) -> bool {
        let mut datasets = self.datasets.write().await;
        let before = datasets.len();
        datasets.retain(|d| &d.id != id);
        before != datasets.len()
    }

    pub async fn clear(&self) {
        self.datasets.write().await.clear();
    }

    /// Preview statistics, `None` when the dataset is unknown or has no content.
    pub async fn stats(&self, id: &DatasetId) -> Option<DatasetStats> {
        let datasets = self.datasets.read().await;
        datasets.iter().find(|d| &d.id == id)?.content.as_ref().map(|c| c.stats())
    }

    /// Insert a record as-is, bypassing validation.
    pub async fn insert(&self, record: DatasetRecord) {
        self.datasets.write().await.push(record);
    }
}

#[async_trait]
impl DatasetProvider for DatasetStore {
    async fn get_dataset(&self, id: &DatasetId) -> Option<DatasetRecord> {
        self.get(id).await
    }
}
