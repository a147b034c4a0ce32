use clap::Parser;
use loadlab_core::init_logging;
use loadlab_driver::{DriverArgs, DriverConfig, LoadTestOrchestrator, ResultWriter};
use std::path::PathBuf;
use tracing::{error, info};

/// Relative schedule paths resolve against the directory holding this binary.
fn driver_dir() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(PathBuf::from))
        .or_else(|| std::env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("."))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to install CTRL+C signal handler: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Received CTRL+C signal, stopping load test");
}

#[tokio::main]
async fn main() {
    let config = match DriverConfig::from_args(DriverArgs::parse()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(2);
        }
    };

    init_logging(&config.logging);

    let report = config.report.clone();
    let orchestrator = match LoadTestOrchestrator::new(config, driver_dir()) {
        Ok(orchestrator) => orchestrator,
        Err(e) => {
            error!("Failed to start driver: {}", e);
            std::process::exit(2);
        }
    };

    let writer = ResultWriter::new(orchestrator.run_until(shutdown_signal()).await);

    if let Some(report) = report {
        match writer.write_report(&report.path, report.format) {
            Ok(()) => info!(path = %report.path.display(), "Report written"),
            Err(e) => {
                error!("{}", e);
                std::process::exit(2);
            }
        }
    }

    // Exit 1 when any request failed.
    if writer.summary().metrics.aggregate.failed_requests > 0 {
        std::process::exit(1);
    }
}
