//! Failure classification for retry decisions
//!
//! Transient failures (timeouts, no response at all, 5xx) are worth another
//! attempt. Everything else, 4xx in particular, is returned to the caller on
//! the first occurrence.

use crate::transport::{ErrorCode, TransportError};

/// What went wrong with one attempt. Derived per failure, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The transport hit its deadline.
    Timeout,
    /// No response was received.
    NetworkUnreachable,
    /// Server replied 500..=599.
    ServerError(u16),
    /// Server replied 400..=499.
    ClientError(u16),
    Other,
}

impl FailureKind {
    pub fn classify(error: &TransportError) -> Self {
        if is_timeout(error) {
            return FailureKind::Timeout;
        }
        match error.response.as_ref().map(|r| r.status) {
            None => FailureKind::NetworkUnreachable,
            Some(status @ 500..=599) => FailureKind::ServerError(status),
            Some(status @ 400..=499) => FailureKind::ClientError(status),
            Some(_) => FailureKind::Other,
        }
    }

    /// Whether another attempt may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            FailureKind::Timeout | FailureKind::NetworkUnreachable | FailureKind::ServerError(_)
        )
    }

    /// Metric/log label.
    pub fn label(&self) -> &'static str {
        match self {
            FailureKind::Timeout => "timeout",
            FailureKind::NetworkUnreachable => "network",
            FailureKind::ServerError(_) => "server_error",
            FailureKind::ClientError(_) => "client_error",
            FailureKind::Other => "other",
        }
    }
}

fn is_timeout(error: &TransportError) -> bool {
    error.code == Some(ErrorCode::Timeout) || error.message.to_ascii_lowercase().contains("timeout")
}
