//! HTTP handlers for the target endpoints.

pub mod health;
pub mod metrics;
pub mod workloads;

pub use health::{health_check, root};
pub use metrics::metrics_handler;
pub use workloads::{cpu, io, json, mem, mix};

use crate::workloads::WorkloadError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::error;

/// Error body returned with every non-2xx response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Workload(#[from] WorkloadError),

    #[error("worker task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        error!("Internal error: {}", self);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                error: format!("Internal error: {}", self),
            }),
        )
            .into_response()
    }
}
