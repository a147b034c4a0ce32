//! Request metrics middleware.

use axum::{
    body::Body,
    extract::MatchedPath,
    http::{Request, Response},
    middleware::Next,
};
use loadlab_core::metrics::{ACTIVE_CONNECTIONS, HTTP_REQUEST_COUNT, HTTP_REQUEST_DURATION};
use std::time::Instant;

/// Count every request by method, matched route and status, and observe its
/// latency. Unmatched paths are labeled `unknown` to keep cardinality bounded.
pub async fn track_metrics(req: Request<Body>, next: Next) -> Response<Body> {
    let start = Instant::now();
    let method = req.method().clone();
    let path = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_owned())
        .unwrap_or_else(|| "unknown".to_string());

    ACTIVE_CONNECTIONS.inc();
    let response = next.run(req).await;
    ACTIVE_CONNECTIONS.dec();

    let status = response.status().as_u16().to_string();
    HTTP_REQUEST_COUNT
        .with_label_values(&[method.as_str(), &path, &status])
        .inc();
    HTTP_REQUEST_DURATION
        .with_label_values(&[method.as_str(), &path])
        .observe(start.elapsed().as_secs_f64());

    response
}
