//! Request pipeline: credential injection + classified retry
//!
//! Per request the pipeline walks a small state machine:
//!
//! ```text
//! Attempting ──ok──▶ Succeeded
//!     │
//!    err
//!     ▼
//! Classifying ──transient && retries < max──▶ RetryScheduled ──sleep──▶ Attempting
//!     │
//!     └──otherwise──▶ Failed (original error returned)
//! ```
//!
//! The loop is bounded by the effective retry budget, so at most `max + 1`
//! dispatches happen per context. The only suspension besides the dispatch
//! itself is the backoff sleep.

use std::sync::Arc;

use session::SessionStore;
use tracing::{debug, instrument, warn};

use crate::classify::FailureKind;
use crate::context::RequestContext;
use crate::credentials::{CredentialInjector, PublicEndpoints};
use crate::metrics;
use crate::policy::RetryPolicy;
use crate::transport::{Response, Transport, TransportError};

/// HTTP client wrapper shared by all callers of the API.
///
/// Holds no per-request state; clone the `Arc` and call `send` from as many
/// tasks as needed.
pub struct RequestPipeline {
    transport: Arc<dyn Transport>,
    credentials: CredentialInjector,
    policy: RetryPolicy,
}

impl RequestPipeline {
    /// Pipeline with the default public endpoints and retry policy.
    pub fn new(transport: Arc<dyn Transport>, session: Arc<dyn SessionStore>) -> Self {
        Self {
            transport,
            credentials: CredentialInjector::new(session, PublicEndpoints::default()),
            policy: RetryPolicy::default(),
        }
    }

    pub fn with_public_endpoints(self, endpoints: PublicEndpoints) -> Self {
        let Self {
            transport,
            credentials,
            policy,
        } = self;
        let session = credentials.into_session();
        Self {
            transport,
            credentials: CredentialInjector::new(session, endpoints),
            policy,
        }
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn public_endpoints(&self) -> &PublicEndpoints {
        self.credentials.public_endpoints()
    }

    /// Send `request`, retrying transient failures.
    ///
    /// Returns the first successful response unchanged, or the error from the
    /// final attempt unchanged. `request.retry_count()` tells the caller how
    /// many retries were spent.
    #[instrument(skip_all, fields(
        request_id = %request.request_id(),
        method = %request.method(),
        url = %request.url()
    ))]
    pub async fn send(&self, request: &mut RequestContext) -> Result<Response, TransportError> {
        let max_retries = self.policy.effective_max(request.max_retry_count());

        loop {
            self.credentials.apply(request);
            metrics::record_attempt(request.method().as_str());
            debug!(attempt = request.retry_count() + 1, "dispatching");

            let error = match self.transport.dispatch(request).await {
                Ok(response) => {
                    debug!(
                        status = response.status,
                        retries = request.retry_count(),
                        "request succeeded"
                    );
                    return Ok(response);
                }
                Err(e) => e,
            };

            let kind = FailureKind::classify(&error);
            if !kind.is_transient() || request.retry_count() >= max_retries {
                debug!(
                    kind = kind.label(),
                    retries = request.retry_count(),
                    max_retries,
                    error = %error,
                    "request failed"
                );
                metrics::record_failure(kind);
                return Err(error);
            }

            let retry = request.record_retry();
            let delay = self.policy.backoff(retry);
            warn!(
                kind = kind.label(),
                retry,
                max_retries,
                delay_ms = delay.as_millis() as u64,
                error = %error,
                "transient failure, retrying"
            );
            metrics::record_retry(kind);
            tokio::time::sleep(delay).await;
        }
    }

    /// `GET url` with the default retry budget.
    pub async fn get(&self, url: impl Into<String>) -> Result<Response, TransportError> {
        let mut request = RequestContext::get(url);
        self.send(&mut request).await
    }
}
