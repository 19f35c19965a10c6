//! Scheduler configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

/// Cadence of the deadline sweeps and which of them run.
#[derive(Debug, Clone, Deserialize)]
pub struct SchedulerConfig {
    /// Seconds between sweep passes
    #[serde(default = "default_interval")]
    pub interval_secs: u64,

    #[serde(default = "enabled")]
    pub late_payments: bool,

    #[serde(default = "enabled")]
    pub regularization: bool,

    #[serde(default = "enabled")]
    pub reminders: bool,
}

impl SchedulerConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.interval_secs == 0 {
            return Err(ValidationError::InvalidSweepInterval);
        }
        Ok(())
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval(),
            late_payments: true,
            regularization: true,
            reminders: true,
        }
    }
}

fn default_interval() -> u64 {
    300
}

fn enabled() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_run_every_sweep() {
        let config = SchedulerConfig::default();
        assert_eq!(config.interval(), Duration::from_secs(300));
        assert!(config.late_payments && config.regularization && config.reminders);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn zero_interval_is_rejected() {
        let config = SchedulerConfig {
            interval_secs: 0,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ValidationError::InvalidSweepInterval));
    }
}
