//! Job registry for training runs.
//!
//! Jobs are kept in creation order for the lifetime of the process. Every mutation goes
//! through one write lock, which is what lets tick drivers and control calls run on
//! different worker threads without losing each other's updates.

use crate::config::SimulatorConfig;
use crate::error::{TrainingError, TrainingResult};
use crate::job::{TrainingJob, TrainingJobId, TrainingParameters, total_steps};
use crate::simulator::bootstrap_logs;
use std::fmt;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};
use tunedeck_data::{DatasetProvider, DatasetStatus};

pub struct JobRegistry {
    datasets: Arc<dyn DatasetProvider>,
    config: SimulatorConfig,
    jobs: RwLock<Vec<TrainingJob>>,
}

impl fmt::Debug for JobRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobRegistry")
            .field("job_count", &self.jobs.try_read().map(|j| j.len()).unwrap_or(0))
            .finish_non_exhaustive()
    }
}

impl JobRegistry {
    #[must_use]
    pub fn new(datasets: Arc<dyn DatasetProvider>, config: SimulatorConfig) -> Self {
        Self { datasets, config, jobs: RwLock::new(Vec::new()) }
    }

    /// Create a job in `Preparing` for a successfully validated dataset.
    pub async fn create(&self, params: TrainingParameters) -> TrainingResult<TrainingJob> {
        let dataset_id = &params.dataset_id;
        if dataset_id.0.trim().is_empty() {
            return Err(TrainingError::not_ready(dataset_id, "no dataset selected"));
        }

        let Some(dataset) = self.datasets.get_dataset(dataset_id).await else {
            warn!(dataset_id = %dataset_id, "Training requested for unknown dataset");
            return Err(TrainingError::not_ready(dataset_id, "dataset not found"));
        };
        if dataset.status != DatasetStatus::Success {
            return Err(TrainingError::not_ready(dataset_id, format!("dataset status is {}", dataset.status)));
        }
        let size = dataset.example_count();
        if size == 0 {
            return Err(TrainingError::not_ready(dataset_id, "dataset has no examples"));
        }
        params.validate()?;

        let total = total_steps(size as u64, params.batch_size, params.epochs);
        let logs = bootstrap_logs(&params, size);
        let mut job = TrainingJob::new(params, total, self.config.initial_estimate(total), logs);

        let mut jobs = self.jobs.write().await;
        while jobs.iter().any(|j| j.id == job.id) {
            job.id = TrainingJobId::new();
        }
        debug!(job_id = %job.id, dataset_size = size, total_steps = total, "Registering training job");
        jobs.push(job.clone());
        Ok(job)
    }

    pub async fn get(&self, id: &TrainingJobId) -> Option<TrainingJob> {
        self.jobs.read().await.iter().find(|j| &j.id == id).cloned()
    }

    /// All jobs, oldest first.
    pub async fn list(&self) -> Vec<TrainingJob> {
        self.jobs.read().await.clone()
    }

    /// Replace the record with the same id. Returns `None` if the id is unknown.
    pub async fn update(&self, job: TrainingJob) -> Option<TrainingJob> {
        let mut jobs = self.jobs.write().await;
        let slot = jobs.iter_mut().find(|j| j.id == job.id)?;
        *slot = job.clone();
        Some(job)
    }

    /// Read-modify-write a job under a single write lock.
    pub async fn modify<R>(&self, id: &TrainingJobId, f: impl FnOnce(&mut TrainingJob) -> R) -> Option<R> {
        let mut jobs = self.jobs.write().await;
        jobs.iter_mut().find(|j| &j.id == id).map(f)
    }

    /// Newest training or paused job, falling back to the newest job of any status.
    pub async fn latest_active(&self) -> Option<TrainingJob> {
        let jobs = self.jobs.read().await;
        jobs.iter().rev().find(|j| j.status.is_active()).or_else(|| jobs.last()).cloned()
    }

    pub async fn len(&self) -> usize {
        self.jobs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.jobs.read().await.is_empty()
    }
}
