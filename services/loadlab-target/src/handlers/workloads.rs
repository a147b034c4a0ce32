//! Parameterized workload endpoints.
//!
//! Query parsing never rejects a request: a malformed query string is treated
//! as empty and every parameter falls back to its default.

use super::ApiError;
use crate::state::AppState;
use crate::workloads::{
    cpu as cpu_work, io as io_work, json as json_work, mem as mem_work, mix as mix_work,
};
use axum::{
    extract::{Query, State},
    http::{header, HeaderName},
    response::IntoResponse,
    Json,
};
use loadlab_core::metrics::WORKLOAD_DURATION;
use loadlab_core::{
    CpuResult, IoResult, MemResult, MixResult, WorkloadKind, WorkloadRequest,
    SERIALIZE_SECONDS_HEADER,
};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::debug;

type RawQuery = Option<Query<HashMap<String, String>>>;

fn resolve(kind: WorkloadKind, query: RawQuery) -> WorkloadRequest {
    let query = query.map(|Query(q)| q).unwrap_or_default();
    let request = WorkloadRequest::from_query(kind, &query);
    debug!(kind = %kind, params = ?request.params().collect::<Vec<_>>(), "resolved workload");
    request
}

fn observe(kind: WorkloadKind, elapsed: Duration) -> f64 {
    let seconds = elapsed.as_secs_f64();
    WORKLOAD_DURATION
        .with_label_values(&[kind.as_str()])
        .observe(seconds);
    seconds
}

/// Run blocking work off the async executor.
async fn blocking<T, F>(work: F) -> Result<T, ApiError>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    Ok(tokio::task::spawn_blocking(work).await?)
}

/// `GET /cpu?iters=&rounds=`
pub async fn cpu(query: RawQuery) -> Result<Json<CpuResult>, ApiError> {
    let request = resolve(WorkloadKind::Cpu, query);
    let iters = request.get_usize("iters");
    let rounds = request.get_usize("rounds");

    let start = Instant::now();
    let hex = blocking(move || cpu_work::derive_rounds(iters, rounds)).await?;
    let elapsed_seconds = observe(WorkloadKind::Cpu, start.elapsed());

    Ok(Json(CpuResult {
        kind: WorkloadKind::Cpu,
        iters: request.get("iters"),
        rounds: request.get("rounds"),
        elapsed_seconds,
        hex,
    }))
}

/// `GET /mem?mb=&ms=`
///
/// The buffer stays resident for the whole sleep and is freed before the
/// response is sent.
pub async fn mem(query: RawQuery) -> Result<Json<MemResult>, ApiError> {
    let request = resolve(WorkloadKind::Mem, query);
    let mb = request.get_usize("mb");
    let ms = request.get_usize("ms") as u64;

    let start = Instant::now();
    let buffer = blocking(move || mem_work::allocate_touched(mb)).await?;
    tokio::time::sleep(Duration::from_millis(ms)).await;
    let sample = buffer.first().copied().unwrap_or_default();
    let elapsed = start.elapsed();
    drop(buffer);

    Ok(Json(MemResult {
        kind: WorkloadKind::Mem,
        mb: request.get("mb"),
        ms: request.get("ms"),
        elapsed_seconds: observe(WorkloadKind::Mem, elapsed),
        sample,
    }))
}

/// `GET /json?kb=`: the serialized document is the body; encode time goes in
/// a response header.
pub async fn json(query: RawQuery) -> Result<impl IntoResponse, ApiError> {
    let request = resolve(WorkloadKind::Json, query);
    let kb = request.get_usize("kb");

    let (body, serialize_time) = blocking(move || json_work::serialize_filler(kb)).await??;
    let seconds = observe(WorkloadKind::Json, serialize_time);

    Ok((
        [
            (header::CONTENT_TYPE, "application/json".to_string()),
            (
                HeaderName::from_static(SERIALIZE_SECONDS_HEADER),
                format!("{:.6}", seconds),
            ),
        ],
        body,
    ))
}

/// `GET /io?kb=`
pub async fn io(
    State(state): State<AppState>,
    query: RawQuery,
) -> Result<Json<IoResult>, ApiError> {
    let request = resolve(WorkloadKind::Io, query);
    let kb = request.get_usize("kb");
    let path = state.blob_path().to_path_buf();

    let start = Instant::now();
    let sha256 = blocking(move || io_work::hash_blob(&path, kb)).await??;
    let elapsed_seconds = observe(WorkloadKind::Io, start.elapsed());

    Ok(Json(IoResult {
        kind: WorkloadKind::Io,
        kb: request.get("kb"),
        elapsed_seconds,
        sha256,
    }))
}

/// `GET /mix?iters=&kb=&sleep_ms=`
pub async fn mix(query: RawQuery) -> Result<Json<MixResult>, ApiError> {
    let request = resolve(WorkloadKind::Mix, query);
    let iters = request.get_usize("iters");
    let kb = request.get_usize("kb");
    let sleep_ms = request.get_usize("sleep_ms") as u64;

    let start = Instant::now();
    let outcome = blocking(move || mix_work::run_mix(iters, kb)).await??;
    tokio::time::sleep(Duration::from_millis(sleep_ms)).await;
    let elapsed_seconds = observe(WorkloadKind::Mix, start.elapsed());

    Ok(Json(MixResult {
        kind: WorkloadKind::Mix,
        iters: request.get("iters"),
        kb: request.get("kb"),
        sleep_ms: request.get("sleep_ms"),
        elapsed_seconds,
        hex: outcome.hex,
        json_len: outcome.json_len,
    }))
}
