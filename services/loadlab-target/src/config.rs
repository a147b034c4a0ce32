//! Configuration for the synthetic load target.
//!
//! Supports multiple configuration sources with precedence:
//! 1. Environment variables (highest priority)
//! 2. TOML configuration file
//! 3. Default values (lowest priority)

use loadlab_core::LoggingConfig;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Config file probed when `LOADLAB_TARGET_CONFIG` is not set.
pub const DEFAULT_CONFIG_FILE: &str = "loadlab-target.toml";

/// Main configuration structure for the target server.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TargetConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub workload: WorkloadConfig,

    #[serde(default)]
    pub identity: IdentityConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Server configuration (host, port)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server host address (default: "0.0.0.0")
    #[serde(default = "default_host")]
    pub host: String,

    /// HTTP port (default: 8080)
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Workload inputs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkloadConfig {
    /// Blob file hashed by `/io` (default: "/opt/app/blob.bin")
    #[serde(default = "default_blob_path")]
    pub blob_path: PathBuf,
}

/// Instance metadata service settings used by `/`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityConfig {
    /// Base URL of the link-local metadata service
    #[serde(default = "default_metadata_endpoint")]
    pub metadata_endpoint: String,

    /// Per-call timeout in milliseconds (default: 200)
    #[serde(default = "default_metadata_timeout_ms")]
    pub timeout_ms: u64,

    /// TTL requested for the session token (default: 60)
    #[serde(default = "default_token_ttl")]
    pub token_ttl_secs: u64,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_blob_path() -> PathBuf {
    PathBuf::from("/opt/app/blob.bin")
}

fn default_metadata_endpoint() -> String {
    "http://169.254.169.254/latest".to_string()
}

fn default_metadata_timeout_ms() -> u64 {
    200
}

fn default_token_ttl() -> u64 {
    60
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for WorkloadConfig {
    fn default() -> Self {
        Self {
            blob_path: default_blob_path(),
        }
    }
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            metadata_endpoint: default_metadata_endpoint(),
            timeout_ms: default_metadata_timeout_ms(),
            token_ttl_secs: default_token_ttl(),
        }
    }
}

impl IdentityConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl TargetConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let contents = std::fs::read_to_string(&path).map_err(|e| ConfigError::IoError {
            path: path.clone(),
            source: e,
        })?;

        toml::from_str(&contents).map_err(|e| ConfigError::TomlError { path, source: e })
    }

    /// Load configuration with environment variable overrides.
    ///
    /// Reads the TOML file named by `LOADLAB_TARGET_CONFIG`, or
    /// [`DEFAULT_CONFIG_FILE`] when present, otherwise starts from defaults.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match std::env::var("LOADLAB_TARGET_CONFIG") {
            Ok(path) => Self::from_file(path)?,
            Err(_) if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                Self::from_file(DEFAULT_CONFIG_FILE)?
            }
            Err(_) => Self::default(),
        };

        config.apply_env_overrides();

        Ok(config)
    }

    /// Apply environment variable overrides to the configuration.
    ///
    /// Supported environment variables:
    /// - `LOADLAB_HOST` - Server host address
    /// - `LOADLAB_PORT` - HTTP port
    /// - `LOADLAB_BLOB_PATH` - Blob file for `/io`
    /// - `LOADLAB_IMDS_ENDPOINT` - Metadata service base URL
    /// - `LOADLAB_IMDS_TIMEOUT_MS` - Metadata call timeout
    /// - `LOADLAB_LOG_LEVEL` / `LOADLAB_LOG_FORMAT` - Logging
    pub fn apply_env_overrides(&mut self) {
        if let Ok(host) = std::env::var("LOADLAB_HOST") {
            self.server.host = host;
        }

        if let Ok(port) = std::env::var("LOADLAB_PORT") {
            if let Ok(port) = port.parse() {
                self.server.port = port;
            }
        }

        if let Ok(path) = std::env::var("LOADLAB_BLOB_PATH") {
            self.workload.blob_path = PathBuf::from(path);
        }

        if let Ok(endpoint) = std::env::var("LOADLAB_IMDS_ENDPOINT") {
            self.identity.metadata_endpoint = endpoint;
        }

        if let Ok(timeout) = std::env::var("LOADLAB_IMDS_TIMEOUT_MS") {
            if let Ok(timeout) = timeout.parse() {
                self.identity.timeout_ms = timeout;
            }
        }

        if let Ok(level) = std::env::var("LOADLAB_LOG_LEVEL") {
            self.logging.level = level;
        }

        if let Ok(format) = std::env::var("LOADLAB_LOG_FORMAT") {
            self.logging.format = format;
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::ValidationError(
                "server.port must be non-zero".to_string(),
            ));
        }

        if self.workload.blob_path.as_os_str().is_empty() {
            return Err(ConfigError::ValidationError(
                "workload.blob_path cannot be empty".to_string(),
            ));
        }

        if self.identity.timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "identity.timeout_ms must be > 0".to_string(),
            ));
        }

        if self.identity.metadata_endpoint.is_empty() {
            return Err(ConfigError::ValidationError(
                "identity.metadata_endpoint cannot be empty".to_string(),
            ));
        }

        self.logging
            .validate()
            .map_err(|e| ConfigError::ValidationError(e.to_string()))?;

        self.bind_address()?;

        Ok(())
    }

    pub fn bind_address(&self) -> Result<SocketAddr, ConfigError> {
        let raw = format!("{}:{}", self.server.host, self.server.port);
        raw.parse().map_err(|e| {
            ConfigError::ValidationError(format!("Invalid bind address '{}': {}", raw, e))
        })
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// I/O error reading configuration file
    #[error("Failed to read config file {path:?}: {source}")]
    IoError {
        path: PathBuf,
        source: std::io::Error,
    },

    /// TOML parsing error
    #[error("Failed to parse TOML in {path:?}: {source}")]
    TomlError {
        path: PathBuf,
        source: toml::de::Error,
    },

    /// Validation error
    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = TargetConfig::default();

        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.workload.blob_path, PathBuf::from("/opt/app/blob.bin"));
        assert_eq!(config.identity.metadata_endpoint, "http://169.254.169.254/latest");
        assert_eq!(config.identity.timeout(), Duration::from_millis(200));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_rejects_zero_port() {
        let mut config = TargetConfig::default();
        config.server.port = 0;

        let result = config.validate();
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("server.port must be non-zero"));
    }

    #[test]
    fn test_validation_rejects_bad_host() {
        let mut config = TargetConfig::default();
        config.server.host = "not a host".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_log_format() {
        let mut config = TargetConfig::default();
        config.logging.format = "yaml".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_file_partial_sections() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[server]\nport = 9191\n\n[workload]\nblob_path = \"/tmp/blob.bin\""
        )
        .unwrap();

        let config = TargetConfig::from_file(file.path()).unwrap();
        assert_eq!(config.server.port, 9191);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.workload.blob_path, PathBuf::from("/tmp/blob.bin"));
        assert_eq!(config.identity.timeout_ms, 200);
    }

    #[test]
    fn test_from_file_missing() {
        let result = TargetConfig::from_file("/nonexistent/loadlab-target.toml");
        assert!(matches!(result, Err(ConfigError::IoError { .. })));
    }
}
