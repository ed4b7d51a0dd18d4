use crate::job::{JobStatus, TrainingJobId, TrainingMetric};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProgressEvent {
    Created { job_id: TrainingJobId, total_steps: u64 },
    StatusChanged { job_id: TrainingJobId, from: JobStatus, to: JobStatus },
    Step { job_id: TrainingJobId, step: u64, total: u64, elapsed: u64, remaining: u64 },
    Metric { job_id: TrainingJobId, metric: TrainingMetric },
    Log { job_id: TrainingJobId, line: String },
    Finished { job_id: TrainingJobId, step: u64, progress: f64 },
}

impl ProgressEvent {
    #[must_use]
    pub fn job_id(&self) -> &TrainingJobId {
        match self {
            Self::Created { job_id, .. }
            | Self::StatusChanged { job_id, .. }
            | Self::Step { job_id, .. }
            | Self::Metric { job_id, .. }
            | Self::Log { job_id, .. }
            | Self::Finished { job_id, .. } => job_id,
        }
    }
}

pub trait ProgressSink: Send + Sync {
    fn on_event(&self, event: ProgressEvent);
}

/// Drops every event.
#[derive(Debug, Default)]
pub struct NullProgressSink;

impl ProgressSink for NullProgressSink {
    fn on_event(&self, _event: ProgressEvent) {}
}

/// Forwards lifecycle events to `tracing`.
#[derive(Debug, Default)]
pub struct TracingProgressSink;

impl ProgressSink for TracingProgressSink {
    fn on_event(&self, event: ProgressEvent) {
        match event {
            ProgressEvent::Created { job_id, total_steps } => info!(job_id = %job_id, total_steps, "Training job created"),
            ProgressEvent::StatusChanged { job_id, from, to } => info!(job_id = %job_id, %from, %to, "Training status changed"),
            ProgressEvent::Step { job_id, step, total, .. } => debug!(job_id = %job_id, step, total, "Training step"),
            ProgressEvent::Metric { job_id, metric } => debug!(
                job_id = %job_id,
                step = metric.step,
                training_loss = metric.training_loss,
                validation_loss = metric.validation_loss,
                "Training metric"
            ),
            ProgressEvent::Log { job_id, line } => debug!(job_id = %job_id, "{line}"),
            ProgressEvent::Finished { job_id, step, progress } => info!(job_id = %job_id, step, progress, "Training finished"),
        }
    }
}

/// Pushes events onto an unbounded channel, for callers that render progress themselves.
#[derive(Debug, Clone)]
pub struct ChannelProgressSink {
    tx: mpsc::UnboundedSender<ProgressEvent>,
}

impl ChannelProgressSink {
    #[must_use]
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ProgressEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl ProgressSink for ChannelProgressSink {
    fn on_event(&self, event: ProgressEvent) {
        // A dropped receiver just means nobody is watching any more.
        let _ = self.tx.send(event);
    }
}
