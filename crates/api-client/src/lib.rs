//! HTTP request pipeline for the hospital API
//!
//! Wraps an HTTP transport with two stages that run on every attempt:
//! 1. Credential injection: `Authorization: Bearer <token>` from the session
//!    store, skipped for public auth endpoints (registration, password reset)
//! 2. Failure recovery: classify the failure and retry timeouts, network
//!    errors and 5xx responses with capped exponential backoff
//!
//! Callers build a `RequestContext` per logical call and hand it to
//! `RequestPipeline::send`. Only the final outcome is returned: the response,
//! or the error produced by the last attempt, untouched.

pub mod classify;
pub mod context;
pub mod credentials;
pub mod error;
pub mod http;
pub mod metrics;
pub mod pipeline;
pub mod policy;
pub mod transport;

pub use classify::FailureKind;
pub use context::RequestContext;
pub use credentials::{CredentialInjector, PublicEndpoints};
pub use error::{Error, Result};
pub use http::ReqwestTransport;
pub use pipeline::RequestPipeline;
pub use policy::RetryPolicy;
pub use transport::{ErrorCode, Response, Transport, TransportError};

pub use reqwest::Method;
