//! Hospital API health check
//!
//! Probes the hospital API through the same request pipeline the app uses
//! (session credentials, classified retries with backoff) and reports whether
//! the API is available or the client should show maintenance mode.
//!
//! Exit code 0 when the last probe found the API available, 1 otherwise.

mod config;
mod health;
mod metrics;

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use api_client::{ReqwestTransport, RequestPipeline};
use session::MemorySessionStore;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::health::{ServiceStatus, log_report};

/// Build the session store and request pipeline described by `config`.
fn build_pipeline(config: &Config) -> Result<RequestPipeline> {
    let session = Arc::new(MemorySessionStore::new());
    if let Some(token) = &config.session.access_token {
        session.set_access_token(token.expose().clone());
    }

    let transport = ReqwestTransport::new(config.api.base_url.clone())
        .context("failed to build HTTP transport")?
        .with_timeout(Duration::from_secs(config.api.timeout_secs));

    Ok(RequestPipeline::new(Arc::new(transport), session)
        .with_public_endpoints(config.api.public_endpoints.clone())
        .with_retry_policy(config.retry.clone()))
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // JSON logs, filter from LOG_LEVEL then RUST_LOG
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_env("LOG_LEVEL")
                .or_else(|_| EnvFilter::try_from_default_env())
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    let args: Vec<String> = std::env::args().collect();
    let cli_config_path = args
        .iter()
        .position(|a| a == "--config")
        .and_then(|i| args.get(i + 1))
        .map(|s| s.as_str());

    let config_path = Config::resolve_path(cli_config_path);
    info!(path = %config_path.display(), "loading configuration");

    let config = Config::load(&config_path)
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;

    info!(
        base_url = %config.api.base_url,
        timeout_secs = config.api.timeout_secs,
        max_retry_count = config.retry.max_retry_count,
        public_endpoints = config.api.public_endpoints.iter().count(),
        authenticated = config.session.access_token.is_some(),
        "configuration loaded"
    );

    // Install before the first request so every attempt is counted
    let prometheus =
        metrics::install_recorder().context("failed to install Prometheus recorder")?;

    let pipeline = build_pipeline(&config)?;

    let report = match config.health.interval_secs {
        Some(secs) => {
            info!(interval_secs = secs, path = %config.health.path, "watching API health");
            health::watch(
                &pipeline,
                &config.health.path,
                Duration::from_secs(secs),
                shutdown_signal(),
            )
            .await
        }
        None => {
            let report = health::check(&pipeline, &config.health.path).await;
            log_report(&report);
            Some(report)
        }
    };

    let status = report.map(|r| r.status);
    info!(
        status = status.map_or("unknown", |s| s.label()),
        "health check finished"
    );
    info!(exposition = %prometheus.render(), "client metrics");
    Ok(match status {
        Some(ServiceStatus::Available) => ExitCode::SUCCESS,
        _ => ExitCode::FAILURE,
    })
}

/// Wait for SIGTERM or SIGINT.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to install Ctrl+C handler");
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
                error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received SIGINT, shutting down"),
        _ = terminate => info!("received SIGTERM, shutting down"),
    }
}
