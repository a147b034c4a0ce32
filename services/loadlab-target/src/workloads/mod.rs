//! Blocking workload implementations.
//!
//! Handlers run these on the blocking pool; nothing here touches the runtime.

pub mod cpu;
pub mod io;
pub mod json;
pub mod mem;
pub mod mix;

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum WorkloadError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("blob file {path:?} is empty")]
    EmptyBlob { path: PathBuf },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type WorkloadResult<T> = Result<T, WorkloadError>;
