//! MediPredict service entry point

use std::sync::Arc;

use anyhow::{Context, Result};
use medipredict_service::{load_engine, start_server, AppState, ConfigManager};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    let config_manager = ConfigManager::load().context("Failed to load configuration")?;
    let config = config_manager.config().clone();

    init_logging(&config.log_level)?;

    info!("Starting MediPredict service v{}", env!("CARGO_PKG_VERSION"));
    match config_manager.source() {
        Some(path) => info!("Configuration loaded from {}", path.display()),
        None => info!("No configuration file found, using defaults"),
    }

    let engine = match load_engine(&config) {
        Ok(engine) => Some(Arc::new(engine)),
        Err(err) if config.fail_fast => {
            error!("Failed to load model artifacts: {}", err);
            return Err(err).context("Model artifacts could not be loaded");
        }
        Err(err) => {
            warn!(
                "Failed to load model artifacts, serving without a model: {}",
                err
            );
            None
        }
    };

    let state = AppState::new(engine, &config);
    start_server(state, &config.bind_addr).await?;

    info!("MediPredict service stopped gracefully");
    Ok(())
}

/// `RUST_LOG` wins over the configured level
fn init_logging(level: &str) -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level)),
        )
        .with(tracing_subscriber::fmt::layer())
        .try_init()
        .context("Failed to initialise logging")
}
