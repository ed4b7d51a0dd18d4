use crate::error::{TrainingError, TrainingResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Timing and sampling knobs for the training simulator.
///
/// `elapsed_time` on a job counts ticks, so one tick is one simulated second no matter
/// how short `tick_interval_ms` is made.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulatorConfig {
    /// Wall-clock period between ticks.
    pub tick_interval_ms: u64,
    /// Delay between job creation and the first `Training` tick.
    pub dispatch_delay_ms: u64,
    /// Ticks needed to complete one step.
    pub ticks_per_step: u64,
    /// A loss sample is taken when the step is a multiple of this.
    pub metric_interval: u64,
    /// Minimum step distance between progress log lines.
    pub log_interval: u64,
    /// Checkpoint + evaluation when the step is a multiple of this.
    pub eval_interval: u64,
    /// Seed for metric noise. `None` draws from entropy.
    pub seed: Option<u64>,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 1000,
            dispatch_delay_ms: 2000,
            ticks_per_step: 2,
            metric_interval: 10,
            log_interval: 10,
            eval_interval: 100,
            seed: None,
        }
    }
}

impl SimulatorConfig {
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    #[must_use]
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    #[must_use]
    pub fn dispatch_delay(&self) -> Duration {
        Duration::from_millis(self.dispatch_delay_ms)
    }

    /// Remaining-time estimate for a job that has not stepped yet, in simulated seconds.
    #[must_use]
    pub fn initial_estimate(&self, total_steps: u64) -> u64 {
        total_steps * self.ticks_per_step
    }

    pub fn validate(&self) -> TrainingResult<()> {
        let positive = [
            ("tick_interval_ms", self.tick_interval_ms),
            ("ticks_per_step", self.ticks_per_step),
            ("metric_interval", self.metric_interval),
            ("log_interval", self.log_interval),
            ("eval_interval", self.eval_interval),
        ];
        for (name, value) in positive {
            if value == 0 {
                return Err(TrainingError::Config(format!("{name} must be >= 1")));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_dashboard_timings() {
        let config = SimulatorConfig::default();
        assert_eq!(config.tick_interval(), Duration::from_secs(1));
        assert_eq!(config.dispatch_delay(), Duration::from_secs(2));
        assert_eq!(config.initial_estimate(9), 18);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: SimulatorConfig = toml::from_str("tick_interval_ms = 50\nseed = 7\n").unwrap();
        assert_eq!(config.tick_interval_ms, 50);
        assert_eq!(config.seed, Some(7));
        assert_eq!(config.eval_interval, 100);
    }

    #[test]
    fn test_zero_intervals_rejected() {
        let config = SimulatorConfig { ticks_per_step: 0, ..SimulatorConfig::default() };
        assert!(matches!(config.validate(), Err(TrainingError::Config(msg)) if msg.contains("ticks_per_step")));
    }
}
