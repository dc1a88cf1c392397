//! FarmIntel - crop recommendation and price prediction service
//!
//! Loads the dataset and price artifacts once at startup, then serves
//! predictions over HTTP until interrupted.

use anyhow::{Context, Result};
use farmintel::{api, config::ServerConfig};
use farmintel_lib::{
    observability::{ServiceMetrics, StructuredLogger},
    service::PredictionService,
};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const SERVICE_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // JSON logs, level from RUST_LOG
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting farmintel");

    let config = ServerConfig::load()?;
    info!(
        dataset = %config.dataset_path.display(),
        price_model_dir = %config.price_model_dir.display(),
        price_crops = ?config.price_crops,
        "Service configured"
    );

    // Training the built-in classifier is CPU-bound
    let settings = config.service_settings();
    let service = tokio::task::spawn_blocking(move || PredictionService::initialize(&settings))
        .await
        .context("Model initialization task panicked")?;

    let metrics = ServiceMetrics::new();
    metrics.set_price_models_loaded(service.price_crops().len());
    metrics.set_crop_model_state(
        service.crop_model_loaded(),
        service
            .recommender()
            .and_then(|r| r.report())
            .map(|report| report.accuracy),
    );
    if !service.crop_model_loaded() && !service.price_models_loaded() {
        warn!("No models loaded, every prediction request will return 503");
    }

    let logger = StructuredLogger::new("farmintel");
    let address = config.bind_address();
    logger.log_startup(SERVICE_VERSION, &address);

    let app_state = Arc::new(api::AppState::new(service, metrics, logger.clone()));

    api::serve(&address, app_state, shutdown_signal()).await?;
    logger.log_shutdown("SIGINT received");
    info!("Shutting down");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
