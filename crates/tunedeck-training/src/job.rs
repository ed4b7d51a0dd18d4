use crate::error::{TrainingError, TrainingResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tunedeck_data::DatasetId;
use uuid::Uuid;

/// Identifier for a training job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TrainingJobId(pub String);

impl TrainingJobId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl Default for TrainingJobId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TrainingJobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for TrainingJobId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Hyperparameters for one fine-tuning run. Immutable once the job exists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingParameters {
    pub model: String,
    pub epochs: u32,
    pub learning_rate: f64,
    pub batch_size: u32,
    pub max_length: u32,
    pub warmup_steps: u32,
    pub weight_decay: f64,
    pub gradient_accumulation_steps: u32,
    pub use_half_precision: bool,
    pub use_lora: bool,
    pub save_best_model: bool,
    pub eval_steps: u32,
    pub dataset_id: DatasetId,
}

impl TrainingParameters {
    /// Dashboard defaults for the given dataset.
    #[must_use]
    pub fn for_dataset(dataset_id: DatasetId) -> Self {
        Self {
            model: "llama-3-8b".to_string(),
            epochs: 3,
            learning_rate: 2e-5,
            batch_size: 8,
            max_length: 512,
            warmup_steps: 100,
            weight_decay: 0.01,
            gradient_accumulation_steps: 1,
            use_half_precision: true,
            use_lora: true,
            save_best_model: true,
            eval_steps: 100,
            dataset_id,
        }
    }

    /// Reject values that would leave `total_steps` undefined.
    pub fn validate(&self) -> TrainingResult<()> {
        if self.epochs == 0 {
            return Err(TrainingError::InvalidParameters("epochs must be >= 1".to_string()));
        }
        if self.batch_size == 0 {
            return Err(TrainingError::InvalidParameters("batch_size must be >= 1".to_string()));
        }
        Ok(())
    }
}

/// `ceil(dataset_size / batch_size) * epochs`.
#[must_use]
pub fn total_steps(dataset_size: u64, batch_size: u32, epochs: u32) -> u64 {
    dataset_size.div_ceil(u64::from(batch_size.max(1))) * u64::from(epochs)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Reserved: no job is created in this state.
    Idle,
    Preparing,
    Training,
    Paused,
    Completed,
    /// Reserved: no transition currently leads here.
    Error,
}

impl JobStatus {
    #[must_use]
    #[allow(clippy::match_same_arms)] // Each arm is a distinct edge of the lifecycle
    pub fn can_transition_to(self, to: Self) -> bool {
        match (self, to) {
            (Self::Idle, Self::Preparing) => true,
            (Self::Preparing, Self::Training) => true,
            (Self::Training, Self::Paused | Self::Completed | Self::Error) => true,
            (Self::Paused, Self::Training | Self::Completed) => true,
            _ => false,
        }
    }

    /// Training or paused: the job still holds a place in the run queue.
    #[must_use]
    pub fn is_active(self) -> bool {
        matches!(self, Self::Training | Self::Paused)
    }

    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Error)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Preparing => "preparing",
            Self::Training => "training",
            Self::Paused => "paused",
            Self::Completed => "completed",
            Self::Error => "error",
        };
        f.write_str(s)
    }
}

/// One sampled point on the loss curves.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrainingMetric {
    pub step: u64,
    pub training_loss: f64,
    pub validation_loss: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationMetric {
    pub metric: String,
    pub value: f64,
    pub previous: f64,
}

impl EvaluationMetric {
    pub const NAMES: [&'static str; 4] = ["Accuracy", "F1 Score", "Precision", "Recall"];

    fn zeroed(metric: &str) -> Self {
        Self { metric: metric.to_string(), value: 0.0, previous: 0.0 }
    }

    /// The four evaluation metrics every job tracks, all at zero.
    #[must_use]
    pub fn initial_set() -> Vec<Self> {
        Self::NAMES.iter().map(|name| Self::zeroed(name)).collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingJob {
    pub id: TrainingJobId,
    pub status: JobStatus,
    /// Percentage in `0.0..=100.0`.
    pub progress: f64,
    pub current_step: u64,
    pub total_steps: u64,
    pub metrics: Vec<TrainingMetric>,
    pub evaluation_metrics: Vec<EvaluationMetric>,
    /// Seconds spent in `Training`.
    pub elapsed_time: u64,
    pub estimated_time_remaining: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub params: TrainingParameters,
    pub logs: Vec<String>,
    pub created_at: DateTime<Utc>,
    /// Step at which the last progress log line was written.
    #[serde(default)]
    pub(crate) last_logged_step: u64,
}

impl TrainingJob {
    #[must_use]
    pub fn new(params: TrainingParameters, total_steps: u64, estimated_time_remaining: u64, logs: Vec<String>) -> Self {
        Self {
            id: TrainingJobId::new(),
            status: JobStatus::Preparing,
            progress: 0.0,
            current_step: 0,
            total_steps,
            metrics: Vec::new(),
            evaluation_metrics: EvaluationMetric::initial_set(),
            elapsed_time: 0,
            estimated_time_remaining,
            error: None,
            params,
            logs,
            created_at: Utc::now(),
            last_logged_step: 0,
        }
    }

    /// Move to `to` if the lifecycle allows it. Returns whether the status changed.
    pub fn transition(&mut self, to: JobStatus) -> bool {
        if self.status.can_transition_to(to) {
            self.status = to;
            true
        } else {
            false
        }
    }

    pub(crate) fn recompute_progress(&mut self) {
        self.progress = if self.total_steps == 0 {
            100.0
        } else {
            (self.current_step as f64 / self.total_steps as f64 * 100.0).min(100.0)
        };
    }

    #[must_use]
    pub fn latest_metric(&self) -> Option<&TrainingMetric> {
        self.metrics.last()
    }

    #[must_use]
    pub fn evaluation(&self, metric: &str) -> Option<&EvaluationMetric> {
        self.evaluation_metrics.iter().find(|m| m.metric == metric)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_total_steps_rounds_partial_batches_up() {
        assert_eq!(total_steps(20, 8, 3), 9);
        assert_eq!(total_steps(16, 8, 3), 6);
        assert_eq!(total_steps(1, 32, 1), 1);
        assert_eq!(total_steps(1000, 1, 2), 2000);
    }

    #[test]
    fn test_params_validate() {
        let mut params = TrainingParameters::for_dataset(DatasetId::from("ds"));
        assert!(params.validate().is_ok());
        params.batch_size = 0;
        assert!(matches!(params.validate(), Err(TrainingError::InvalidParameters(_))));
        params.batch_size = 4;
        params.epochs = 0;
        assert!(params.validate().is_err());
    }

    #[test]
    fn test_status_transitions() {
        assert!(JobStatus::Preparing.can_transition_to(JobStatus::Training));
        assert!(JobStatus::Training.can_transition_to(JobStatus::Paused));
        assert!(JobStatus::Paused.can_transition_to(JobStatus::Training));
        assert!(JobStatus::Paused.can_transition_to(JobStatus::Completed));
        assert!(!JobStatus::Preparing.can_transition_to(JobStatus::Paused));
        assert!(!JobStatus::Preparing.can_transition_to(JobStatus::Completed));
        assert!(!JobStatus::Paused.can_transition_to(JobStatus::Error));
        for to in [JobStatus::Idle, JobStatus::Preparing, JobStatus::Training, JobStatus::Paused, JobStatus::Error] {
            assert!(!JobStatus::Completed.can_transition_to(to));
        }
    }

    #[test]
    fn test_new_job_starts_preparing_with_zeroed_evaluation() {
        let job = TrainingJob::new(TrainingParameters::for_dataset(DatasetId::from("ds")), 9, 18, vec![]);
        assert_eq!(job.status, JobStatus::Preparing);
        assert_eq!(job.evaluation_metrics.len(), 4);
        assert_eq!(job.evaluation("F1 Score").unwrap().value, 0.0);
        assert_eq!(job.estimated_time_remaining, 18);
    }

    #[test]
    fn test_status_serializes_snake_case() {
        assert_eq!(serde_json::to_string(&JobStatus::Completed).unwrap(), "\"completed\"");
    }
}
