//! Driver against the real target on a loopback port.

use loadlab_driver::{Baselines, DriverConfig, LoadTestOrchestrator, ReportFormat, ResultWriter};
use loadlab_target::{build_router, AppState, TargetConfig};
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

async fn spawn_target(blob: PathBuf) -> String {
    let mut config = TargetConfig::default();
    config.workload.blob_path = blob;
    let app = build_router(AppState::new(config, Vec::new()));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

fn light_baselines() -> Baselines {
    Baselines {
        cpu_iters: 10_000,
        cpu_rounds: 1,
        mem_mb: 1,
        mem_ms: 5,
        json_kb: 1,
        io_kb: 4,
        mix_iters: 10_000,
        mix_kb: 1,
        mix_sleep_ms: 1,
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_staged_run_against_target() {
    let dir = tempfile::tempdir().unwrap();

    let blob = dir.path().join("blob.bin");
    std::fs::File::create(&blob)
        .unwrap()
        .write_all(&[0x5a; 2048])
        .unwrap();

    std::fs::write(
        dir.path().join("stages.json"),
        r#"[{"duration": 1, "users": 3, "spawn_rate": 30}]"#,
    )
    .unwrap();

    let config = DriverConfig {
        target_url: spawn_target(blob).await,
        stages_file: Some(PathBuf::from("stages.json")),
        baselines: light_baselines(),
        wait_min: Duration::from_millis(10),
        wait_max: Duration::from_millis(20),
        tick_interval: Duration::from_millis(100),
        ..Default::default()
    };

    let orchestrator = LoadTestOrchestrator::new(config, dir.path()).unwrap();
    assert!(orchestrator.source().is_custom());
    assert_eq!(orchestrator.timeline().steps().len(), 1);

    let summary = orchestrator.run().await;
    let total = &summary.metrics.aggregate;

    assert_eq!(summary.peak_users, 3);
    assert!(total.total_requests >= 3);
    assert_eq!(total.failed_requests, 0, "errors: {:?}", total.errors);
    assert_eq!(summary.metrics.per_request["GET / (warmup)"].total_requests, 3);

    let report_path = dir.path().join("report.json");
    ResultWriter::new(summary)
        .write_report(&report_path, ReportFormat::Json)
        .unwrap();
    let report: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&report_path).unwrap()).unwrap();
    assert_eq!(report["failed_requests"], 0);
    assert_eq!(report["custom_schedule"], true);
}

#[tokio::test]
async fn test_missing_schedule_falls_back_to_default() {
    let dir = tempfile::tempdir().unwrap();
    let config = DriverConfig {
        stages_file: Some(PathBuf::from("does-not-exist.json")),
        ..Default::default()
    };

    let orchestrator = LoadTestOrchestrator::new(config, dir.path()).unwrap();
    assert!(!orchestrator.source().is_custom());

    let cutoffs: Vec<u64> = orchestrator
        .timeline()
        .steps()
        .iter()
        .map(|s| s.cutoff_secs)
        .collect();
    assert_eq!(cutoffs, vec![60, 180, 360]);
}
