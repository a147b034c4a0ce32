//! Client classification against a real loopback server.

use axum::{http::StatusCode, routing::get, Json, Router};
use loadlab_core::{LoadTimeline, ScheduleSource, StageDefinition, WorkloadKind};
use loadlab_driver::{
    DriverConfig, LoadTestOrchestrator, PlannedRequest, RequestFailure, TargetClient,
};
use serde_json::json;
use std::time::Duration;

async fn serve(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

fn misbehaving_target() -> Router {
    Router::new()
        .route("/cpu", get(|| async { Json(json!({"kind": "mem", "iters": 10000})) }))
        .route(
            "/mem",
            get(|| async { (StatusCode::SERVICE_UNAVAILABLE, "busy") }),
        )
        .route("/io", get(|| async { "definitely not json" }))
        .route(
            "/slow",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(3)).await;
                "late"
            }),
        )
}

fn request(path: &'static str, kind: Option<WorkloadKind>) -> PlannedRequest {
    PlannedRequest {
        name: path,
        path,
        query: Vec::new(),
        expected_kind: kind,
    }
}

#[tokio::test]
async fn test_wrong_kind_is_a_failure() {
    let base = serve(misbehaving_target()).await;
    let client = TargetClient::new(base, Duration::from_secs(1), Duration::from_secs(5)).unwrap();

    let outcome = client
        .execute(&request("/cpu", Some(WorkloadKind::Cpu)))
        .await;
    assert!(!outcome.is_success());
    assert_eq!(
        outcome.result,
        Err(RequestFailure::KindMismatch {
            expected: WorkloadKind::Cpu,
            actual: "mem".to_string(),
        })
    );
}

#[tokio::test]
async fn test_status_and_parse_failures() {
    let base = serve(misbehaving_target()).await;
    let client = TargetClient::new(base, Duration::from_secs(1), Duration::from_secs(5)).unwrap();

    let outcome = client
        .execute(&request("/mem", Some(WorkloadKind::Mem)))
        .await;
    assert_eq!(outcome.result, Err(RequestFailure::Http(503)));

    let outcome = client.execute(&request("/io", Some(WorkloadKind::Io))).await;
    assert!(matches!(outcome.result, Err(RequestFailure::Parse(_))));

    let outcome = client.execute(&request("/missing", None)).await;
    assert_eq!(outcome.result, Err(RequestFailure::Http(404)));
}

#[tokio::test]
async fn test_read_timeout_is_bounded() {
    let base = serve(misbehaving_target()).await;
    let client =
        TargetClient::new(base, Duration::from_secs(1), Duration::from_millis(200)).unwrap();

    let outcome = client.execute(&request("/slow", None)).await;
    assert!(matches!(outcome.result, Err(RequestFailure::Transport(_))));
    assert!(outcome.latency < Duration::from_secs(2));
}

#[tokio::test]
async fn test_connection_refused_is_transport_failure() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = TargetClient::new(
        format!("http://{}", addr),
        Duration::from_millis(500),
        Duration::from_millis(500),
    )
    .unwrap();
    let outcome = client.execute(&PlannedRequest::warmup()).await;
    assert_eq!(outcome.name, "GET / (warmup)");
    assert!(matches!(outcome.result, Err(RequestFailure::Transport(_))));
}

#[tokio::test]
async fn test_mismatching_target_never_records_success() {
    let base = serve(misbehaving_target()).await;
    let config = DriverConfig {
        target_url: base,
        tags: vec!["cpu".to_string()],
        wait_min: Duration::from_millis(5),
        wait_max: Duration::from_millis(10),
        tick_interval: Duration::from_millis(100),
        ..Default::default()
    };

    let timeline = LoadTimeline::from_stages(&[StageDefinition::new(1, 2, 20.0)]);
    let orchestrator = LoadTestOrchestrator::with_timeline(
        config,
        timeline,
        ScheduleSource::Fallback {
            reason: "test".to_string(),
        },
    )
    .unwrap();

    let summary = orchestrator.run().await;
    let cpu = &summary.metrics.per_request["GET /cpu"];
    assert!(cpu.total_requests > 0);
    assert_eq!(cpu.successful_requests, 0);
    assert_eq!(
        cpu.errors.keys().collect::<Vec<_>>(),
        vec![r#"kind mismatch: expected "cpu", got "mem""#]
    );

    // No root route on this server, so every warmup fails too.
    let warmup = &summary.metrics.per_request["GET / (warmup)"];
    assert_eq!(warmup.failed_requests, warmup.total_requests);
    assert_eq!(summary.peak_users, 2);
}
