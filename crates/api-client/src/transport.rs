//! Transport abstraction the pipeline dispatches through
//!
//! The pipeline is transport-agnostic: anything that can turn a
//! `RequestContext` into a `Response` or a `TransportError` can sit under it.
//! `crate::http::ReqwestTransport` is the production implementation; tests use
//! scripted fakes.

use std::future::Future;
use std::pin::Pin;

use bytes::Bytes;
use reqwest::header::HeaderMap;
use serde::de::DeserializeOwned;

use crate::context::RequestContext;

/// Fallback text when neither the server nor the transport said anything.
pub const DEFAULT_USER_MESSAGE: &str = "Network error";

/// A response the server actually sent.
#[derive(Debug, Clone)]
pub struct Response {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl Response {
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: body.into(),
        }
    }

    /// Body as UTF-8 text, lossy.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn json<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
        serde_json::from_slice(&self.body)
    }
}

/// Symbolic cause reported by the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// The transport gave up waiting for the server.
    Timeout,
    /// Could not connect (DNS, refused, unreachable).
    Connect,
    /// The request could not be built or sent.
    Request,
    /// The response body could not be read.
    Body,
    /// Server answered with a 4xx status.
    ClientStatus,
    /// Server answered with a 5xx status.
    ServerStatus,
    Other,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::Timeout => "timeout",
            ErrorCode::Connect => "connect",
            ErrorCode::Request => "request",
            ErrorCode::Body => "body",
            ErrorCode::ClientStatus => "client_status",
            ErrorCode::ServerStatus => "server_status",
            ErrorCode::Other => "other",
        }
    }
}

/// Failure of a single dispatch attempt.
///
/// `response` is present only when the server replied; its absence is what
/// marks a network-level failure.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{message}")]
pub struct TransportError {
    pub code: Option<ErrorCode>,
    pub message: String,
    pub response: Option<Response>,
}

impl TransportError {
    /// Failure with no server reply.
    pub fn network(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code: Some(code),
            message: message.into(),
            response: None,
        }
    }

    /// Deadline exceeded with no reply.
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::network(ErrorCode::Timeout, message)
    }

    /// The server replied with an error status.
    pub fn from_response(response: Response) -> Self {
        let code = if (500..600).contains(&response.status) {
            ErrorCode::ServerStatus
        } else if (400..500).contains(&response.status) {
            ErrorCode::ClientStatus
        } else {
            ErrorCode::Other
        };
        Self {
            code: Some(code),
            message: format!("Request failed with status code {}", response.status),
            response: Some(response),
        }
    }

    pub fn status(&self) -> Option<u16> {
        self.response.as_ref().map(|r| r.status)
    }

    /// Text suitable for showing to a user: the server's `message` field when
    /// the body is a JSON object carrying one, else the transport message.
    pub fn user_message(&self) -> String {
        let from_body = self
            .response
            .as_ref()
            .and_then(|r| r.json::<serde_json::Value>().ok())
            .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(str::to_owned))
            .filter(|m| !m.is_empty());
        match from_body {
            Some(m) => m,
            None if !self.message.is_empty() => self.message.clone(),
            None => DEFAULT_USER_MESSAGE.to_string(),
        }
    }
}

/// Boxed future returned by `Transport::dispatch`.
pub type DispatchFuture<'a> =
    Pin<Box<dyn Future<Output = std::result::Result<Response, TransportError>> + Send + 'a>>;

/// Sends one attempt of a request.
///
/// Uses a boxed future so the pipeline can hold `Arc<dyn Transport>`.
/// Implementations must resolve with `Ok` for any status below 400 and with a
/// `TransportError` carrying the response for 4xx/5xx.
pub trait Transport: Send + Sync {
    fn dispatch<'a>(&'a self, request: &'a RequestContext) -> DispatchFuture<'a>;
}
