//! Billing API configuration.
//!
//! Loaded in three layers, later layers winning:
//!
//! 1. built-in defaults
//! 2. optional `medibill.toml` in the working directory
//! 3. environment variables prefixed `MEDIBILL_` (`MEDIBILL_PORT=9000`)

use chrono::Weekday;
use medibill_core::period::parse_week_start;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Billing API configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Bind address
    pub host: String,

    /// HTTP port
    pub port: u16,

    /// SQLite database file
    pub database_path: PathBuf,

    /// Pool size
    pub max_connections: u32,

    /// First day of the week for the `this_week` statistics period
    pub week_start: String,

    /// Default tracing filter when `RUST_LOG` is unset
    pub log_level: String,

    /// Emit JSON log lines instead of human-readable output
    pub log_json: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        ApiConfig {
            host: "0.0.0.0".to_string(),
            port: 8080,
            database_path: PathBuf::from("medibill.db"),
            max_connections: 5,
            week_start: "monday".to_string(),
            log_level: "info,billing_api=debug,medibill_db=info".to_string(),
            log_json: false,
        }
    }
}

impl ApiConfig {
    /// Loads configuration from defaults, `medibill.toml` and the environment.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from("medibill")
    }

    /// Same as [`ApiConfig::load`] with an explicit config file stem.
    pub fn load_from(file_stem: &str) -> Result<Self, ConfigError> {
        let defaults = ApiConfig::default();

        let settings = config::Config::builder()
            .set_default("host", defaults.host)?
            .set_default("port", defaults.port as i64)?
            .set_default("database_path", defaults.database_path.display().to_string())?
            .set_default("max_connections", defaults.max_connections as i64)?
            .set_default("week_start", defaults.week_start)?
            .set_default("log_level", defaults.log_level)?
            .set_default("log_json", defaults.log_json)?
            .add_source(config::File::with_name(file_stem).required(false))
            .add_source(config::Environment::with_prefix("MEDIBILL").try_parsing(true))
            .build()?;

        let config: ApiConfig = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Checks values that deserialize fine but make no sense.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.port == 0 {
            return Err(ConfigError::InvalidValue {
                key: "port".to_string(),
                reason: "must not be 0".to_string(),
            });
        }
        if self.max_connections == 0 {
            return Err(ConfigError::InvalidValue {
                key: "max_connections".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        parse_week_start(&self.week_start).map_err(|e| ConfigError::InvalidValue {
            key: "week_start".to_string(),
            reason: e.to_string(),
        })?;
        Ok(())
    }

    /// The configured first day of the week.
    pub fn week_start(&self) -> Weekday {
        parse_week_start(&self.week_start).unwrap_or(Weekday::Mon)
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Invalid value for {key}: {reason}")]
    InvalidValue { key: String, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = ApiConfig::default();
        config.validate().unwrap();
        assert_eq!(config.week_start(), Weekday::Mon);
        assert_eq!(config.bind_address(), "0.0.0.0:8080");
    }

    #[test]
    fn test_load_from_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        let stem = dir.path().join("billing");
        std::fs::write(
            stem.with_extension("toml"),
            "port = 9100\nweek_start = \"sunday\"\nlog_json = true\n",
        )
        .unwrap();

        let config = ApiConfig::load_from(stem.to_str().unwrap()).unwrap();
        assert_eq!(config.port, 9100);
        assert_eq!(config.week_start(), Weekday::Sun);
        assert!(config.log_json);
        // Untouched keys keep their defaults
        assert_eq!(config.max_connections, 5);
    }

    #[test]
    fn test_rejects_bad_week_start() {
        let config = ApiConfig {
            week_start: "someday".to_string(),
            ..ApiConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { ref key, .. }) if key == "week_start"
        ));
    }
}
