//! TuneDeck Training
//!
//! Simulated fine-tuning jobs:
//! - Job records and hyperparameters (`TrainingJob`, `TrainingParameters`)
//! - Process-lifetime storage (`JobRegistry`)
//! - Synthetic tick-by-tick progression (`simulator`)
//! - Start/pause/resume/stop with timer-driven drivers (`TrainingController`)
//! - Progress fan-out (`ProgressSink`)

pub mod config;
pub mod controller;
pub mod error;
pub mod job;
pub mod progress;
pub mod registry;
pub mod simulator;
pub mod time;

pub use config::SimulatorConfig;
pub use controller::TrainingController;
pub use error::{TrainingError, TrainingResult};
pub use job::{EvaluationMetric, JobStatus, TrainingJob, TrainingJobId, TrainingMetric, TrainingParameters, total_steps};
pub use progress::{ChannelProgressSink, NullProgressSink, ProgressEvent, ProgressSink, TracingProgressSink};
pub use registry::JobRegistry;
pub use simulator::{FixedNoise, NoiseSource, TickReport};
pub use time::format_hms;
