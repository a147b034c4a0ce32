use loadlab_core::init_logging;
use loadlab_target::{run_server, TargetConfig};
use tracing::error;

#[tokio::main]
async fn main() {
    let config = match TargetConfig::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = config.validate() {
        eprintln!("Invalid configuration: {}", e);
        std::process::exit(1);
    }

    init_logging(&config.logging);

    if let Err(e) = run_server(config).await {
        error!("Server error: {}", e);
        std::process::exit(1);
    }
}
