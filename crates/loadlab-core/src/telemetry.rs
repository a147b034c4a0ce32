//! Logging initialization shared by the target and the driver binaries.

use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

pub const VALID_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];
pub const VALID_FORMATS: [&str; 2] = ["json", "pretty"];

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error (default: "info")
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: json or pretty (default: "pretty")
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl LoggingConfig {
    pub fn validate(&self) -> CoreResult<()> {
        if !VALID_LEVELS.contains(&self.level.as_str()) {
            return Err(CoreError::Validation(format!(
                "logging.level must be one of: {}",
                VALID_LEVELS.join(", ")
            )));
        }

        if !VALID_FORMATS.contains(&self.format.as_str()) {
            return Err(CoreError::Validation(format!(
                "logging.format must be one of: {}",
                VALID_FORMATS.join(", ")
            )));
        }

        Ok(())
    }
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over the configured level. Calling this twice
/// is harmless; the second subscriber is simply not installed.
pub fn init_logging(config: &LoggingConfig) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_thread_ids(true)
        .with_line_number(true);

    let installed = if config.format == "json" {
        builder.json().try_init().is_ok()
    } else {
        builder.try_init().is_ok()
    };

    if installed {
        tracing::info!(level = %config.level, format = %config.format, "Logging initialized");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_logging_config() {
        let config = LoggingConfig::default();
        assert_eq!(config.level, "info");
        assert_eq!(config.format, "pretty");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_logging_validation() {
        let config = LoggingConfig {
            level: "loud".to_string(),
            ..Default::default()
        };
        assert!(config
            .validate()
            .unwrap_err()
            .to_string()
            .contains("logging.level"));

        let config = LoggingConfig {
            format: "xml".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
