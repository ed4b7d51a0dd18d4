//! CLI configuration file support.
//!
//! Configuration precedence (later wins):
//! 1. Defaults
//! 2. Global config file (~/.tunedeck/config.toml)
//! 3. Local config file (./.tunedeckrc)
//! 4. File passed with `--config`
//! 5. CLI arguments (handled by clap)

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tunedeck_export::ExportConfig;
use tunedeck_training::SimulatorConfig;

/// Errors that can occur during configuration loading.
#[derive(Debug, Error)]
pub enum CliConfigError {
    #[error("Configuration file not found: {0}")]
    NotFound(String),

    #[error("Failed to read configuration file: {0}")]
    ReadError(String),

    #[error("Failed to parse configuration file: {0}")]
    ParseError(String),
}

pub type CliConfigResult<T> = std::result::Result<T, CliConfigError>;

/// Simulator settings. Unset keys fall through to lower-precedence files.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulatorSection {
    pub tick_interval_ms: Option<u64>,
    pub dispatch_delay_ms: Option<u64>,
    pub ticks_per_step: Option<u64>,
    pub metric_interval: Option<u64>,
    pub log_interval: Option<u64>,
    pub eval_interval: Option<u64>,
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportSection {
    pub export_delay_ms: Option<u64>,
    pub deploy_delay_ms: Option<u64>,
    pub connect_delay_ms: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CliConfig {
    #[serde(default)]
    pub log_level: Option<String>,

    #[serde(default)]
    pub simulator: SimulatorSection,

    #[serde(default)]
    pub export: ExportSection,
}

fn overlay(slot: &mut Option<u64>, other: Option<u64>) {
    if other.is_some() {
        *slot = other;
    }
}

impl CliConfig {
    /// Load configuration from a TOML file.
    pub fn load_from_file(path: &Path) -> CliConfigResult<Self> {
        if !path.exists() {
            return Err(CliConfigError::NotFound(path.display().to_string()));
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| CliConfigError::ReadError(format!("{}: {}", path.display(), e)))?;

        toml::from_str(&content).map_err(|e| CliConfigError::ParseError(format!("{}: {}", path.display(), e)))
    }

    pub fn default_global_path() -> PathBuf {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(".tunedeck")
            .join("config.toml")
    }

    pub fn default_local_path() -> PathBuf {
        PathBuf::from(".tunedeckrc")
    }

    /// Merge the global and local files, then the explicit one if given.
    ///
    /// Missing discovered files are skipped; an explicit file must exist and parse.
    pub fn discover_and_load(explicit: Option<&Path>) -> CliConfigResult<Self> {
        let mut config = Self::default();

        for path in [Self::default_global_path(), Self::default_local_path()] {
            match Self::load_from_file(&path) {
                Ok(found) => config.merge(&found),
                Err(CliConfigError::NotFound(_)) => {}
                Err(e) => return Err(e),
            }
        }

        if let Some(path) = explicit {
            config.merge(&Self::load_from_file(path)?);
        }

        Ok(config)
    }

    /// Values set in `other` override values in `self`.
    pub fn merge(&mut self, other: &Self) {
        if let Some(ref log_level) = other.log_level {
            self.log_level = Some(log_level.clone());
        }

        let sim = &mut self.simulator;
        overlay(&mut sim.tick_interval_ms, other.simulator.tick_interval_ms);
        overlay(&mut sim.dispatch_delay_ms, other.simulator.dispatch_delay_ms);
        overlay(&mut sim.ticks_per_step, other.simulator.ticks_per_step);
        overlay(&mut sim.metric_interval, other.simulator.metric_interval);
        overlay(&mut sim.log_interval, other.simulator.log_interval);
        overlay(&mut sim.eval_interval, other.simulator.eval_interval);
        overlay(&mut sim.seed, other.simulator.seed);

        let export = &mut self.export;
        overlay(&mut export.export_delay_ms, other.export.export_delay_ms);
        overlay(&mut export.deploy_delay_ms, other.export.deploy_delay_ms);
        overlay(&mut export.connect_delay_ms, other.export.connect_delay_ms);
    }

    pub fn simulator_config(&self) -> SimulatorConfig {
        let s = &self.simulator;
        let defaults = SimulatorConfig::default();
        SimulatorConfig {
            tick_interval_ms: s.tick_interval_ms.unwrap_or(defaults.tick_interval_ms),
            dispatch_delay_ms: s.dispatch_delay_ms.unwrap_or(defaults.dispatch_delay_ms),
            ticks_per_step: s.ticks_per_step.unwrap_or(defaults.ticks_per_step),
            metric_interval: s.metric_interval.unwrap_or(defaults.metric_interval),
            log_interval: s.log_interval.unwrap_or(defaults.log_interval),
            eval_interval: s.eval_interval.unwrap_or(defaults.eval_interval),
            seed: s.seed.or(defaults.seed),
        }
    }

    pub fn export_config(&self) -> ExportConfig {
        let e = &self.export;
        let defaults = ExportConfig::default();
        ExportConfig {
            export_delay_ms: e.export_delay_ms.unwrap_or(defaults.export_delay_ms),
            deploy_delay_ms: e.deploy_delay_ms.unwrap_or(defaults.deploy_delay_ms),
            connect_delay_ms: e.connect_delay_ms.unwrap_or(defaults.connect_delay_ms),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_merge_keeps_unset_keys() {
        let mut base: CliConfig = toml::from_str(
            r#"
            log_level = "debug"
            [simulator]
            tick_interval_ms = 50
            seed = 1
            "#,
        )
        .unwrap();
        let local: CliConfig = toml::from_str("[simulator]\nseed = 9\n[export]\nexport_delay_ms = 0\n").unwrap();

        base.merge(&local);
        assert_eq!(base.log_level.as_deref(), Some("debug"));
        assert_eq!(base.simulator.tick_interval_ms, Some(50));
        assert_eq!(base.simulator.seed, Some(9));

        let sim = base.simulator_config();
        assert_eq!(sim.tick_interval_ms, 50);
        assert_eq!(sim.ticks_per_step, 2);
        assert_eq!(base.export_config().export_delay_ms, 0);
        assert_eq!(base.export_config().deploy_delay_ms, 5000);
    }

    #[test]
    fn test_load_from_file_errors() {
        let temp = TempDir::new().unwrap();
        let missing = temp.path().join("nope.toml");
        assert!(matches!(CliConfig::load_from_file(&missing), Err(CliConfigError::NotFound(_))));

        let broken = temp.path().join("broken.toml");
        std::fs::write(&broken, "simulator = 3").unwrap();
        assert!(matches!(CliConfig::load_from_file(&broken), Err(CliConfigError::ParseError(_))));
    }
}
