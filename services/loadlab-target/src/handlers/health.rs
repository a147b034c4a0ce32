//! Liveness and identity endpoints.

use crate::state::AppState;
use axum::{extract::State, http::header, response::IntoResponse};

/// `GET /`: greet with the instance's private DNS name and address.
pub async fn root(State(state): State<AppState>) -> impl IntoResponse {
    let identity = state
        .identity
        .get_or_resolve(&state.identity_sources)
        .await;

    (
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        identity.greeting(),
    )
}

/// `GET /health`
pub async fn health_check() -> &'static str {
    "ok"
}
