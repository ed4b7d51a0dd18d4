//! TuneDeck Export
//!
//! Simulated hand-off of finished training jobs: local artifact export in one of the
//! catalog formats, and deployment to a connected cloud target.

pub mod catalog;
pub mod config;
pub mod error;
pub mod service;

pub use catalog::{CloudTarget, ModelFormat, cloud_targets, model_formats};
pub use config::ExportConfig;
pub use error::{ExportError, ExportResult};
pub use service::{Deployment, ExportArtifact, ExportOptions, ExportService};
