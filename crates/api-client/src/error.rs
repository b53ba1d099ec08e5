//! Errors from building the client (not from sending requests)

/// Construction-time failures. Per-request failures are `TransportError`s
/// and are returned to the caller exactly as the transport produced them.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid base URL {url:?}: {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

/// Result alias for client construction.
pub type Result<T> = std::result::Result<T, Error>;
