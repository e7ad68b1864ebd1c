//! Credit Scoring Service - Main Entry Point
//!
//! Loads the scaler and model once, then serves predictions over HTTP until
//! interrupted.

use anyhow::{Context, Result};
use credit_scoring_service::{
    api::{router, AppState},
    config::{AppConfig, LoggingConfig},
    metrics::{MetricsReporter, ServiceMetrics},
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::load()?;
    init_tracing(&config.logging)?;

    info!("Starting Credit Scoring Service v{}", env!("CARGO_PKG_VERSION"));
    info!(
        "Decision threshold: {:.2}, risk bands: medium>={:.2}, high>={:.2}",
        config.classification.decision_threshold,
        config.classification.medium,
        config.classification.high
    );

    let metrics = Arc::new(ServiceMetrics::new().context("Failed to register metrics")?);
    let state = AppState::new(config.clone(), metrics.clone());

    if let Err(e) = state.load() {
        error!(error = %e, "Scoring pipeline failed to start");
        return Err(e.into());
    }

    if config.metrics.summary_interval_secs > 0 {
        let reporter = MetricsReporter::new(metrics.clone(), config.metrics.summary_interval_secs);
        tokio::spawn(reporter.start());
    }

    let addr = config.server.bind_addr();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Listening on http://{}", addr);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    info!("Service shutting down...");
    metrics.print_summary();

    Ok(())
}

fn init_tracing(logging: &LoggingConfig) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::new(format!("credit_scoring_service={}", logging.level)),
    };

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if logging.format == "json" {
        builder
            .json()
            .try_init()
            .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))
    } else {
        builder
            .try_init()
            .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
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
                error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received");
}
