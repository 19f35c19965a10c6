//! Application configuration module
//!
//! Type-safe configuration loaded from environment variables with the
//! `config` and `dotenvy` crates. Variables use the `TANDA_LEDGER` prefix
//! and `__` between nested keys.
//!
//! # Example
//!
//! ```no_run
//! use tanda_ledger::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//!
//! println!("Sweeping every {:?}", config.scheduler.interval());
//! ```

mod anchor;
mod database;
mod error;
mod logging;
mod scheduler;

pub use anchor::AnchorConfig;
pub use database::DatabaseConfig;
pub use error::{ConfigError, ValidationError};
pub use logging::{LogFormat, LoggingConfig};
pub use scheduler::SchedulerConfig;

use serde::Deserialize;

use crate::application::scheduler::SweepConfig;

const ENV_PREFIX: &str = "TANDA_LEDGER";

/// Root configuration of the ledger service.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database: DatabaseConfig,

    #[serde(default)]
    pub scheduler: SchedulerConfig,

    #[serde(default)]
    pub anchor: AnchorConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from the environment, after reading `.env` if
    /// one is present.
    ///
    /// # Environment Variable Format
    ///
    /// - `TANDA_LEDGER__DATABASE__URL=...` -> `database.url`
    /// - `TANDA_LEDGER__SCHEDULER__INTERVAL_SECS=60` -> `scheduler.interval_secs`
    /// - `TANDA_LEDGER__ANCHOR__SALT=...` -> `anchor.salt`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` when a required variable is missing or a value
    /// does not parse.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Semantic checks that deserialization cannot express.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.database.validate()?;
        self.scheduler.validate()?;
        self.anchor.validate()?;
        self.logging.validate()?;
        Ok(())
    }

    /// Sweep runner settings derived from the scheduler section.
    pub fn sweep_config(&self) -> SweepConfig {
        SweepConfig {
            interval: self.scheduler.interval(),
            late_payments: self.scheduler.late_payments,
            regularization: self.scheduler.regularization,
            reminders: self.scheduler.reminders,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use std::env;
    use std::sync::Mutex;

    // Environment variables are process-global
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    const VARS: &[&str] = &[
        "TANDA_LEDGER__DATABASE__URL",
        "TANDA_LEDGER__SCHEDULER__INTERVAL_SECS",
        "TANDA_LEDGER__SCHEDULER__REMINDERS",
        "TANDA_LEDGER__ANCHOR__ENABLED",
        "TANDA_LEDGER__ANCHOR__SALT",
        "TANDA_LEDGER__LOGGING__FORMAT",
    ];

    fn clear_env() {
        for var in VARS {
            env::remove_var(var);
        }
    }

    fn load_with(vars: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        env::set_var("TANDA_LEDGER__DATABASE__URL", "postgresql://test@localhost/tandas");
        for (key, value) in vars {
            env::set_var(key, value);
        }
        let result = AppConfig::load();
        clear_env();
        result
    }

    #[test]
    fn minimal_environment_loads_with_defaults() {
        let _guard = ENV_MUTEX.lock().unwrap();
        let config = load_with(&[]).unwrap();

        assert_eq!(config.database.url, "postgresql://test@localhost/tandas");
        assert_eq!(config.scheduler.interval_secs, 300);
        assert!(!config.anchor.enabled);
        assert_eq!(config.logging.format, LogFormat::Pretty);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn nested_values_override_defaults() {
        let _guard = ENV_MUTEX.lock().unwrap();
        let config = load_with(&[
            ("TANDA_LEDGER__SCHEDULER__INTERVAL_SECS", "60"),
            ("TANDA_LEDGER__SCHEDULER__REMINDERS", "false"),
            ("TANDA_LEDGER__ANCHOR__ENABLED", "true"),
            ("TANDA_LEDGER__ANCHOR__SALT", "0123456789abcdef0123"),
            ("TANDA_LEDGER__LOGGING__FORMAT", "json"),
        ])
        .unwrap();

        let sweeps = config.sweep_config();
        assert_eq!(sweeps.interval.as_secs(), 60);
        assert!(sweeps.late_payments);
        assert!(!sweeps.reminders);
        assert_eq!(config.anchor.salt.expose_secret(), "0123456789abcdef0123");
        assert_eq!(config.logging.format, LogFormat::Json);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn enabled_anchor_without_salt_fails_validation() {
        let _guard = ENV_MUTEX.lock().unwrap();
        let config = load_with(&[("TANDA_LEDGER__ANCHOR__ENABLED", "true")]).unwrap();

        assert_eq!(
            config.validate(),
            Err(ValidationError::MissingRequired("ANCHOR_SALT"))
        );
    }

    #[test]
    fn missing_database_url_fails_to_load() {
        let _guard = ENV_MUTEX.lock().unwrap();
        clear_env();
        assert!(AppConfig::load().is_err());
    }
}
