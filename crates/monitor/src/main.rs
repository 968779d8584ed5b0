//! System Monitor - host resource dashboard with outlier detection
//!
//! Serves the dashboard and JSON API. Samples are taken on demand by
//! request handlers; there is no background sampling loop.

use anyhow::Result;
use monitor_lib::{
    api::{self, AppState},
    sampler::{host_name, SystemSampler},
    Monitor, StructuredLogger,
};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod config;

const MONITOR_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting system-monitor");

    let config = config::MonitorConfig::load()?;
    let addr = config.socket_addr()?;
    let host = host_name().unwrap_or_else(|| "unknown".to_string());
    info!(host = %host, addr = %addr, "Monitor configured");

    let logger = StructuredLogger::new(&host);
    let sampler = Arc::new(SystemSampler::new(config.cpu_sample_interval()));

    let monitor = Arc::new(
        Monitor::builder(sampler)
            .history_size(config.metrics_history_size)
            .contamination(config.anomaly_contamination)
            .thresholds(config.alert_thresholds())
            .logger(logger.clone())
            .build(),
    );
    monitor.register_components().await;

    logger.log_startup(
        MONITOR_VERSION,
        monitor.history_stats().capacity,
        monitor.contamination(),
    );

    let app_state = Arc::new(AppState::new(monitor, config.metrics_interval));
    api::serve(addr, app_state, shutdown_signal(logger)).await?;

    info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal(logger: StructuredLogger) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    logger.log_shutdown("SIGINT received");
}
