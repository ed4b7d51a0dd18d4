use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Simulated latencies for export and deployment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    pub export_delay_ms: u64,
    pub deploy_delay_ms: u64,
    pub connect_delay_ms: u64,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self { export_delay_ms: 3000, deploy_delay_ms: 5000, connect_delay_ms: 2000 }
    }
}

impl ExportConfig {
    #[must_use]
    pub fn export_delay(&self) -> Duration {
        Duration::from_millis(self.export_delay_ms)
    }

    #[must_use]
    pub fn deploy_delay(&self) -> Duration {
        Duration::from_millis(self.deploy_delay_ms)
    }

    #[must_use]
    pub fn connect_delay(&self) -> Duration {
        Duration::from_millis(self.connect_delay_ms)
    }
}
