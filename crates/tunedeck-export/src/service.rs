//! Export and deployment of finished jobs.
//!
//! Nothing is written anywhere. Each operation validates its inputs up front, waits out
//! the configured latency, and hands back a description of what would have been produced.

use crate::catalog::{CloudTarget, ModelFormat, cloud_targets, model_formats};
use crate::config::ExportConfig;
use crate::error::{ExportError, ExportResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};
use tunedeck_training::{JobStatus, TrainingJob, TrainingJobId};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportOptions {
    /// Base file name; defaults to `{model}-ft-v1`.
    pub model_name: Option<String>,
    pub quantization: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportArtifact {
    pub job_id: TrainingJobId,
    pub format_id: String,
    pub file_name: String,
    pub size_label: String,
    pub quantization: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deployment {
    pub job_id: TrainingJobId,
    pub target_id: String,
    pub target_name: String,
    pub deployed_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct ExportService {
    formats: Vec<ModelFormat>,
    targets: Arc<RwLock<Vec<CloudTarget>>>,
    config: ExportConfig,
}

impl Default for ExportService {
    fn default() -> Self {
        Self::new(ExportConfig::default())
    }
}

impl ExportService {
    #[must_use]
    pub fn new(config: ExportConfig) -> Self {
        Self { formats: model_formats(), targets: Arc::new(RwLock::new(cloud_targets())), config }
    }

    #[must_use]
    pub fn formats(&self) -> &[ModelFormat] {
        &self.formats
    }

    #[must_use]
    pub fn find_format(&self, id: &str) -> Option<&ModelFormat> {
        self.formats.iter().find(|f| f.id == id)
    }

    /// Snapshot of the cloud targets and their connection state.
    pub async fn targets(&self) -> Vec<CloudTarget> {
        self.targets.read().await.clone()
    }

    pub async fn export_model(
        &self,
        job: &TrainingJob,
        format_id: &str,
        options: ExportOptions,
    ) -> ExportResult<ExportArtifact> {
        if job.status != JobStatus::Completed {
            warn!(job_id = %job.id, status = %job.status, "Export requested before training completed");
            return Err(ExportError::NotCompleted { status: job.status });
        }
        let Some(format) = self.find_format(format_id) else {
            warn!(job_id = %job.id, format = format_id, "Export requested in unknown format");
            return Err(ExportError::UnknownFormat(format_id.to_string()));
        };

        info!(job_id = %job.id, format = %format.name, "Exporting model");
        tokio::time::sleep(self.config.export_delay()).await;

        let model_name = options.model_name.unwrap_or_else(|| format!("{}-ft-v1", job.params.model));
        let artifact = ExportArtifact {
            job_id: job.id.clone(),
            format_id: format.id.clone(),
            file_name: format!("{model_name}.{}", format.extension),
            size_label: format.size.clone(),
            quantization: options.quantization,
            created_at: Utc::now(),
        };
        info!(job_id = %job.id, file_name = %artifact.file_name, size = %artifact.size_label, "Model exported");
        Ok(artifact)
    }

    pub async fn deploy_to_cloud(&self, job: &TrainingJob, target_id: &str) -> ExportResult<Deployment> {
        let target = {
            let targets = self.targets.read().await;
            targets.iter().find(|t| t.id == target_id).cloned()
        };
        let Some(target) = target else {
            warn!(job_id = %job.id, target = target_id, "Deployment requested to unknown target");
            return Err(ExportError::UnknownTarget(target_id.to_string()));
        };
        if !target.connected {
            warn!(job_id = %job.id, target = %target.name, "Deployment target is not connected");
            return Err(ExportError::NotConnected { target: target.name });
        }

        info!(job_id = %job.id, target = %target.name, "Deploying model");
        tokio::time::sleep(self.config.deploy_delay()).await;

        info!(job_id = %job.id, target = %target.name, "Model deployed");
        Ok(Deployment {
            job_id: job.id.clone(),
            target_id: target.id,
            target_name: target.name,
            deployed_at: Utc::now(),
        })
    }

    pub async fn connect_cloud_provider(&self, target_id: &str) -> ExportResult<CloudTarget> {
        if !self.targets.read().await.iter().any(|t| t.id == target_id) {
            warn!(target = target_id, "Connection requested to unknown target");
            return Err(ExportError::UnknownTarget(target_id.to_string()));
        }

        tokio::time::sleep(self.config.connect_delay()).await;

        let mut targets = self.targets.write().await;
        let target = targets
            .iter_mut()
            .find(|t| t.id == target_id)
            .ok_or_else(|| ExportError::UnknownTarget(target_id.to_string()))?;
        target.connected = true;
        info!(target = %target.name, "Connected to cloud provider");
        Ok(target.clone())
    }
}
