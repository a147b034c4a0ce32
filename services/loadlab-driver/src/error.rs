use std::path::PathBuf;

/// Errors that stop the driver before or after a run.
///
/// Request-level problems are never surfaced here; they are recorded as
/// failures by the metrics collector.
#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),

    #[error("Failed to write report {path:?}: {source}")]
    Report {
        path: PathBuf,
        source: std::io::Error,
    },
}

pub type DriverResult<T> = Result<T, DriverError>;
