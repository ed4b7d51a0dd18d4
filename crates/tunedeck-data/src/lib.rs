//! TuneDeck Data
//!
//! Dataset intake for the fine-tuning simulator:
//! - Sniffing and validating uploaded files (`DatasetFormat`)
//! - Holding dataset records and their validation results (`DatasetStore`)
//! - The read-only lookup seam the training core consumes (`DatasetProvider`)

pub mod error;
pub mod format;
pub mod record;
pub mod store;

pub use error::{DatasetError, DatasetResult};
pub use format::DatasetFormat;
pub use record::{DatasetContent, DatasetId, DatasetRecord, DatasetStats, DatasetStatus};
pub use store::{DatasetProvider, DatasetStore};
