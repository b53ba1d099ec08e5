//! API health probe
//!
//! A successful `GET <health path>` means the API is available. Any error the
//! pipeline surfaces (after its own retries) puts the client into maintenance
//! mode, carrying the message a user would be shown.

use std::future::Future;
use std::time::Duration;

use api_client::{RequestContext, RequestPipeline};
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceStatus {
    Available,
    Maintenance,
}

impl ServiceStatus {
    pub fn label(&self) -> &'static str {
        match self {
            ServiceStatus::Available => "available",
            ServiceStatus::Maintenance => "maintenance",
        }
    }
}

/// Outcome of one probe.
#[derive(Debug, Clone)]
pub struct HealthReport {
    pub status: ServiceStatus,
    /// Status code of the final response, if the server answered.
    pub http_status: Option<u16>,
    /// User-facing explanation when in maintenance.
    pub message: Option<String>,
    /// Retries the pipeline spent on this probe.
    pub retries: u32,
}

/// Probe the API once.
pub async fn check(pipeline: &RequestPipeline, path: &str) -> HealthReport {
    let mut request = RequestContext::get(path);
    match pipeline.send(&mut request).await {
        Ok(response) => HealthReport {
            status: ServiceStatus::Available,
            http_status: Some(response.status),
            message: None,
            retries: request.retry_count(),
        },
        Err(e) => HealthReport {
            status: ServiceStatus::Maintenance,
            http_status: e.status(),
            message: Some(e.user_message()),
            retries: request.retry_count(),
        },
    }
}

/// Probe every `interval` until `shutdown` resolves, logging each status
/// change. Returns the last report, if any probe ran.
pub async fn watch<F>(
    pipeline: &RequestPipeline,
    path: &str,
    interval: Duration,
    shutdown: F,
) -> Option<HealthReport>
where
    F: Future<Output = ()>,
{
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    tokio::pin!(shutdown);

    let mut last: Option<HealthReport> = None;
    loop {
        tokio::select! {
            biased;
            _ = &mut shutdown => break,
            _ = ticker.tick() => {
                let report = check(pipeline, path).await;
                let previous = last.as_ref().map(|r| r.status);
                if previous != Some(report.status) {
                    log_report(&report);
                }
                last = Some(report);
            }
        }
    }
    last
}

pub fn log_report(report: &HealthReport) {
    match report.status {
        ServiceStatus::Available => info!(
            http_status = report.http_status,
            retries = report.retries,
            "API available"
        ),
        ServiceStatus::Maintenance => warn!(
            http_status = report.http_status,
            retries = report.retries,
            message = report.message.as_deref().unwrap_or_default(),
            "API unavailable, maintenance mode"
        ),
    }
}
