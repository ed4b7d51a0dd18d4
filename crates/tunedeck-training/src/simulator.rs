//! Synthetic training progression.
//!
//! Everything here is synchronous and clock-free: one call to [`tick`] is one tick of
//! simulated time applied to a job record. The controller owns the timers and calls in
//! here under the registry write lock.

use crate::config::SimulatorConfig;
use crate::job::{JobStatus, TrainingJob, TrainingMetric, TrainingParameters};
use rand::Rng;
use rand::rngs::StdRng;

/// Source of the uniform noise mixed into synthetic metrics.
pub trait NoiseSource: Send {
    /// Sample from `[0, scale)`.
    fn uniform(&mut self, scale: f64) -> f64;
}

impl NoiseSource for StdRng {
    fn uniform(&mut self, scale: f64) -> f64 {
        self.gen_range(0.0..1.0) * scale
    }
}

/// Noise that always lands on the same fraction of the range.
#[derive(Debug, Clone, Copy)]
pub struct FixedNoise(pub f64);

impl NoiseSource for FixedNoise {
    fn uniform(&mut self, scale: f64) -> f64 {
        self.0 * scale
    }
}

/// What a single tick did to the job.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    /// The step counter moved on this tick.
    pub advanced: bool,
    pub metric: Option<TrainingMetric>,
    /// Log lines appended during this tick.
    pub logs: Vec<String>,
    pub evaluated: bool,
    pub completed: bool,
}

/// Log lines written when a job is created.
#[must_use]
pub fn bootstrap_logs(params: &TrainingParameters, dataset_size: usize) -> Vec<String> {
    vec![
        format!("INFO: Starting fine-tuning of {} model", params.model),
        format!("INFO: Loading dataset with {dataset_size} examples"),
        format!(
            "INFO: Training with batch size {}, learning rate {:.2e}",
            params.batch_size, params.learning_rate
        ),
    ]
}

/// Complete a job on behalf of the user. The caller checks the status first.
pub fn stop(job: &mut TrainingJob) -> bool {
    if !job.transition(JobStatus::Completed) {
        return false;
    }
    job.logs.push(format!("INFO: Training stopped by user at step {}", job.current_step));
    true
}

/// Advance a `Training` job by one tick. Returns `None` and leaves the job alone for
/// any other status.
pub fn tick(job: &mut TrainingJob, config: &SimulatorConfig, noise: &mut dyn NoiseSource) -> Option<TickReport> {
    if job.status != JobStatus::Training {
        return None;
    }

    let mut report = TickReport::default();
    let logs_before = job.logs.len();

    job.elapsed_time += 1;
    if job.elapsed_time % config.ticks_per_step == 0 && job.current_step < job.total_steps {
        job.current_step += 1;
        report.advanced = true;
    }

    job.recompute_progress();
    if job.current_step > 0 {
        let remaining = job.total_steps.saturating_sub(job.current_step) as f64;
        let per_step = job.elapsed_time as f64 / job.current_step as f64;
        job.estimated_time_remaining = (remaining * per_step).max(0.0).round() as u64;
    }

    if report.advanced {
        let step = job.current_step;

        if step % config.metric_interval == 0 {
            let metric = sample_metric(job, noise);
            job.metrics.push(metric);
            report.metric = Some(metric);
        }

        if step - job.last_logged_step >= config.log_interval {
            job.last_logged_step = step;
            let line = match job.latest_metric() {
                Some(m) => format!(
                    "INFO: Step {step}/{}: Training loss: {:.3}, Validation loss: {:.3}",
                    job.total_steps, m.training_loss, m.validation_loss
                ),
                None => format!("INFO: Step {step}/{}: Training loss: n/a, Validation loss: n/a", job.total_steps),
            };
            job.logs.push(line);
        }

        if step % config.eval_interval == 0 {
            evaluate(job, noise);
            report.evaluated = true;
        }

        if step >= job.total_steps {
            complete(job);
            report.completed = true;
        }
    }

    report.logs = job.logs[logs_before..].to_vec();
    Some(report)
}

fn sample_metric(job: &TrainingJob, noise: &mut dyn NoiseSource) -> TrainingMetric {
    let fraction = job.current_step as f64 / job.total_steps as f64;
    let base_loss = (2.0 - fraction * 1.8).max(0.2);
    let training_loss = base_loss - 0.05 + noise.uniform(0.1);
    let validation_loss = training_loss + 0.1 + noise.uniform(0.2);

    TrainingMetric {
        step: job.current_step,
        training_loss: round_to(training_loss, 4),
        validation_loss: round_to(validation_loss, 4),
    }
}

fn evaluate(job: &mut TrainingJob, noise: &mut dyn NoiseSource) {
    let step = job.current_step;
    job.logs.push(format!("INFO: Saving checkpoint at step {step}"));
    job.logs.push("INFO: Evaluating model on validation set".to_string());

    let improvement = step as f64 / job.total_steps as f64 * 0.3;
    for metric in &mut job.evaluation_metrics {
        metric.previous = metric.value;
        metric.value = round_to((0.6 + improvement + noise.uniform(0.1)).min(0.95), 2);
    }

    let (accuracy, f1) = headline_scores(job);
    job.logs.push(format!("INFO: Validation metrics: Accuracy: {accuracy:.2}, F1: {f1:.2}"));
}

fn complete(job: &mut TrainingJob) {
    job.transition(JobStatus::Completed);
    job.progress = 100.0;
    job.logs.push("INFO: Training completed successfully".to_string());
    let (accuracy, f1) = headline_scores(job);
    job.logs.push(format!("INFO: Final metrics - Accuracy: {accuracy:.2}, F1: {f1:.2}"));
}

fn headline_scores(job: &TrainingJob) -> (f64, f64) {
    let value = |name: &str| job.evaluation(name).map_or(0.0, |m| m.value);
    (value("Accuracy"), value("F1 Score"))
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}
