//! Client-side request metrics
//!
//! Emitted through the `metrics` facade; they are no-ops until the embedding
//! application installs a recorder.
//!
//! - `api_client_attempts_total` (counter): label `method`
//! - `api_client_retries_total` (counter): label `kind`
//! - `api_client_failures_total` (counter): label `kind`, one per call that
//!   surfaced an error to its caller

use crate::classify::FailureKind;

/// Record one dispatch attempt.
pub fn record_attempt(method: &str) {
    metrics::counter!("api_client_attempts_total", "method" => method.to_string()).increment(1);
}

/// Record a retry scheduled after a transient failure.
pub fn record_retry(kind: FailureKind) {
    metrics::counter!("api_client_retries_total", "kind" => kind.label()).increment(1);
}

/// Record a call that ended in an error.
pub fn record_failure(kind: FailureKind) {
    metrics::counter!("api_client_failures_total", "kind" => kind.label()).increment(1);
}
