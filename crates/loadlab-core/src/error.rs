use std::path::PathBuf;
use thiserror::Error;

/// Canonical error type for schedule loading and shared validation.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Schedule file does not exist.
    #[error("no stages json found: \"{}\"", path.display())]
    ScheduleNotFound {
        /// Path that was probed.
        path: PathBuf,
    },

    /// Schedule document has the wrong top-level or element shape.
    #[error("{0}")]
    ScheduleShape(String),

    /// A single stage is missing a key or carries an unusable value.
    #[error("stage[{index}] {message}")]
    InvalidStage {
        /// Zero-based position of the stage in the array.
        index: usize,
        /// Human-readable explanation.
        message: String,
    },

    /// I/O error occurred while reading a file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON could not be parsed.
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Validation error for configuration or input data.
    #[error("validation error: {0}")]
    Validation(String),
}

impl CoreError {
    /// Creates an `InvalidStage` variant.
    #[must_use]
    pub fn invalid_stage(index: usize, message: impl Into<String>) -> Self {
        Self::InvalidStage {
            index,
            message: message.into(),
        }
    }
}

/// Convenient result alias for core operations.
pub type CoreResult<T> = Result<T, CoreError>;
