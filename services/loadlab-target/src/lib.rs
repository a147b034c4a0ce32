//! Synthetic workload target.
//!
//! An HTTP server whose endpoints each stress one resource dimension
//! (CPU, resident memory, serialization, file I/O, or a mix) so that a load
//! driver can drive autoscaling experiments against it.

pub mod config;
pub mod handlers;
pub mod identity;
pub mod middleware;
pub mod rest;
pub mod state;
pub mod workloads;

pub use config::{ConfigError, TargetConfig};
pub use identity::{IdentityCache, IdentitySource, PrivateIdentity};
pub use rest::build_router;
pub use state::AppState;

use tracing::{error, info, warn};

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Identity(#[from] identity::IdentityError),

    #[error("server I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Validate `config`, bind, and serve until CTRL+C or SIGTERM.
pub async fn run_server(config: TargetConfig) -> Result<(), ServerError> {
    config.validate()?;
    let addr = config.bind_address()?;

    if !config.workload.blob_path.exists() {
        warn!(
            path = %config.workload.blob_path.display(),
            "blob file not found; /io will fail until it exists"
        );
    }

    let state = AppState::from_config(config)?;
    let app = build_router(state);

    info!("Starting loadlab target on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Loadlab target shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to install CTRL+C signal handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received CTRL+C signal, initiating graceful shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM signal, initiating graceful shutdown");
        }
    }
}
