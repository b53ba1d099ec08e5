//! reqwest-backed transport
//!
//! Resolves request URLs against the API base URL, applies the per-request
//! timeout and turns 4xx/5xx replies into `TransportError`s that still carry
//! the response, so the pipeline can tell a server answer from silence.

use std::time::Duration;

use tracing::debug;

use crate::context::RequestContext;
use crate::error::{Error, Result};
use crate::transport::{DispatchFuture, ErrorCode, Response, Transport, TransportError};

/// Per-attempt deadline when none is configured.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Production transport over a shared `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl ReqwestTransport {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        Self::with_client(reqwest::Client::builder().build()?, base_url)
    }

    /// Reuse an existing client (connection pool, TLS config).
    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Result<Self> {
        let base_url = base_url.into();
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(Error::InvalidBaseUrl {
                url: base_url,
                reason: "must start with http:// or https://".into(),
            });
        }
        reqwest::Url::parse(&base_url).map_err(|e| Error::InvalidBaseUrl {
            url: base_url.clone(),
            reason: e.to_string(),
        })?;
        Ok(Self {
            client,
            base_url,
            timeout: DEFAULT_TIMEOUT,
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Absolute URL for a request target. Absolute targets pass through;
    /// relative ones are joined to the base with exactly one `/`.
    pub fn resolve(&self, url: &str) -> String {
        if url.starts_with("http://") || url.starts_with("https://") {
            return url.to_string();
        }
        if url.is_empty() {
            return self.base_url.clone();
        }
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            url.trim_start_matches('/')
        )
    }
}

impl Transport for ReqwestTransport {
    fn dispatch<'a>(&'a self, request: &'a RequestContext) -> DispatchFuture<'a> {
        Box::pin(async move {
            let url = self.resolve(request.url());
            let mut builder = self
                .client
                .request(request.method().clone(), &url)
                .headers(request.headers().clone())
                .timeout(self.timeout);
            if let Some(body) = request.body() {
                builder = builder.body(body.clone());
            }

            let upstream = builder.send().await.map_err(transport_error)?;
            let status = upstream.status().as_u16();
            let headers = upstream.headers().clone();
            let body = upstream.bytes().await.map_err(transport_error)?;
            debug!(%url, status, bytes = body.len(), "response received");

            let response = Response {
                status,
                headers,
                body,
            };
            if status >= 400 {
                return Err(TransportError::from_response(response));
            }
            Ok(response)
        })
    }
}

/// Map a reqwest failure (no usable response) to a transport error.
///
/// Every failure here lacks a response, so it classifies as a network error
/// and is retried. That includes builder errors such as a malformed absolute
/// target URL, which spend the whole retry budget before surfacing.
fn transport_error(e: reqwest::Error) -> TransportError {
    let code = if e.is_timeout() {
        ErrorCode::Timeout
    } else if e.is_connect() {
        ErrorCode::Connect
    } else if e.is_body() || e.is_decode() {
        ErrorCode::Body
    } else if e.is_request() || e.is_builder() {
        ErrorCode::Request
    } else {
        ErrorCode::Other
    };
    TransportError::network(code, e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::FailureKind;
    use crate::credentials::PublicEndpoints;
    use crate::pipeline::RequestPipeline;
    use crate::policy::RetryPolicy;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use axum::routing::{any, get};
    use session::MemorySessionStore;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU64, Ordering};
    use tokio::net::TcpListener;

    /// Mock API: echo, a failing health probe that counts hits, a 404 with a
    /// server message, and an endpoint slower than any test timeout.
    async fn start_api() -> (String, Arc<AtomicU64>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let health_hits = Arc::new(AtomicU64::new(0));
        let counter = health_hits.clone();

        let app = axum::Router::new()
            .route(
                "/v1/echo",
                any(|request: Request<Body>| async move {
                    let authorization = request
                        .headers()
                        .get("authorization")
                        .map(|v| v.to_str().unwrap_or("").to_string());
                    let method = request.method().to_string();
                    let body = axum::body::to_bytes(request.into_body(), 1024 * 1024)
                        .await
                        .unwrap();
                    axum::Json(serde_json::json!({
                        "authorization": authorization,
                        "method": method,
                        "body": String::from_utf8_lossy(&body),
                    }))
                }),
            )
            .route(
                "/v1/register",
                any(|request: Request<Body>| async move {
                    let has_auth = request.headers().contains_key("authorization");
                    axum::Json(serde_json::json!({ "has_authorization": has_auth }))
                }),
            )
            .route(
                "/v1/health",
                get(move || {
                    let counter = counter.clone();
                    async move {
                        counter.fetch_add(1, Ordering::SeqCst);
                        (StatusCode::SERVICE_UNAVAILABLE, "maintenance")
                    }
                }),
            )
            .route(
                "/v1/patients/42",
                get(|| async {
                    (
                        StatusCode::NOT_FOUND,
                        axum::Json(serde_json::json!({ "message": "Patient not found" })),
                    )
                }),
            )
            .route(
                "/v1/slow",
                get(|| async {
                    tokio::time::sleep(Duration::from_secs(30)).await;
                    "too late"
                }),
            );

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        (format!("http://{addr}/v1/"), health_hits)
    }

    fn fast_policy() -> RetryPolicy {
        RetryPolicy {
            max_retry_count: 3,
            base_delay_ms: 1,
            max_delay_ms: 5,
        }
    }

    #[test]
    fn resolve_joins_with_single_slash() {
        let t = ReqwestTransport::new("https://api.example.com/v1/").unwrap();
        assert_eq!(t.resolve("/health"), "https://api.example.com/v1/health");
        assert_eq!(t.resolve("health"), "https://api.example.com/v1/health");
        assert_eq!(t.resolve(""), "https://api.example.com/v1/");

        let t = ReqwestTransport::new("https://api.example.com/v1").unwrap();
        assert_eq!(t.resolve("/health"), "https://api.example.com/v1/health");
    }

    #[test]
    fn resolve_passes_absolute_urls_through() {
        let t = ReqwestTransport::new("https://api.example.com/v1/").unwrap();
        assert_eq!(
            t.resolve("https://status.example.com/ping"),
            "https://status.example.com/ping"
        );
    }

    #[test]
    fn rejects_base_url_without_scheme() {
        let err = ReqwestTransport::new("api.example.com/v1").unwrap_err();
        assert!(
            err.to_string().contains("must start with http"),
            "got: {err}"
        );
    }

    #[test]
    fn default_timeout_is_ten_seconds() {
        let t = ReqwestTransport::new("https://api.example.com").unwrap();
        assert_eq!(t.timeout(), Duration::from_secs(10));
        let t = t.with_timeout(Duration::from_millis(250));
        assert_eq!(t.timeout(), Duration::from_millis(250));
    }

    #[tokio::test]
    async fn injects_token_and_forwards_body() {
        let (base, _) = start_api().await;
        let transport = Arc::new(ReqwestTransport::new(base).unwrap());
        let session = Arc::new(MemorySessionStore::with_token("tok-live"));
        let pipeline = RequestPipeline::new(transport, session);

        let mut ctx = RequestContext::post("/echo").with_body("hello");
        let response = pipeline.send(&mut ctx).await.unwrap();

        assert_eq!(response.status, 200);
        let json: serde_json::Value = response.json().unwrap();
        assert_eq!(json["authorization"], "Bearer tok-live");
        assert_eq!(json["method"], "POST");
        assert_eq!(json["body"], "hello");
    }

    #[tokio::test]
    async fn register_reaches_server_without_authorization() {
        let (base, _) = start_api().await;
        let transport = Arc::new(ReqwestTransport::new(base).unwrap());
        let session = Arc::new(MemorySessionStore::with_token("tok-live"));
        let pipeline = RequestPipeline::new(transport, session)
            .with_public_endpoints(PublicEndpoints::default());

        let response = pipeline.get("/register").await.unwrap();
        let json: serde_json::Value = response.json().unwrap();
        assert_eq!(json["has_authorization"], false);
    }

    #[tokio::test]
    async fn server_errors_exhaust_retry_budget() {
        let (base, hits) = start_api().await;
        let transport = Arc::new(ReqwestTransport::new(base).unwrap());
        let session = Arc::new(MemorySessionStore::new());
        let pipeline = RequestPipeline::new(transport, session).with_retry_policy(fast_policy());

        let mut ctx = RequestContext::get("/health");
        let err = pipeline.send(&mut ctx).await.unwrap_err();

        assert_eq!(err.status(), Some(503));
        assert_eq!(err.response.as_ref().unwrap().text(), "maintenance");
        assert_eq!(hits.load(Ordering::SeqCst), 4, "1 initial + 3 retries");
        assert_eq!(ctx.retry_count(), 3);
    }

    #[tokio::test]
    async fn not_found_surfaces_server_message() {
        let (base, _) = start_api().await;
        let transport = Arc::new(ReqwestTransport::new(base).unwrap());
        let session = Arc::new(MemorySessionStore::new());
        let pipeline = RequestPipeline::new(transport, session).with_retry_policy(fast_policy());

        let mut ctx = RequestContext::get("/patients/42");
        let err = pipeline.send(&mut ctx).await.unwrap_err();

        assert_eq!(err.status(), Some(404));
        assert_eq!(err.code, Some(ErrorCode::ClientStatus));
        assert_eq!(err.user_message(), "Patient not found");
        assert_eq!(ctx.retry_count(), 0);
    }

    #[tokio::test]
    async fn slow_server_is_classified_as_timeout() {
        let (base, _) = start_api().await;
        let transport = Arc::new(
            ReqwestTransport::new(base)
                .unwrap()
                .with_timeout(Duration::from_millis(50)),
        );
        let session = Arc::new(MemorySessionStore::new());
        let pipeline = RequestPipeline::new(transport, session);

        let mut ctx = RequestContext::get("/slow").with_max_retry_count(0);
        let err = pipeline.send(&mut ctx).await.unwrap_err();

        assert_eq!(err.code, Some(ErrorCode::Timeout));
        assert!(err.response.is_none());
        assert_eq!(FailureKind::classify(&err), FailureKind::Timeout);
    }

    #[tokio::test]
    async fn refused_connection_is_a_network_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let transport = Arc::new(ReqwestTransport::new(format!("http://{addr}")).unwrap());
        let session = Arc::new(MemorySessionStore::new());
        let pipeline = RequestPipeline::new(transport, session).with_retry_policy(fast_policy());

        let mut ctx = RequestContext::get("/health");
        let err = pipeline.send(&mut ctx).await.unwrap_err();

        assert!(err.response.is_none());
        assert_eq!(FailureKind::classify(&err), FailureKind::NetworkUnreachable);
        assert_eq!(ctx.retry_count(), 3, "network errors use the full budget");
    }

    #[tokio::test]
    async fn malformed_target_url_is_retried_as_network_error() {
        let transport = Arc::new(ReqwestTransport::new("http://127.0.0.1:1").unwrap());
        let session = Arc::new(MemorySessionStore::new());
        let pipeline = RequestPipeline::new(transport, session).with_retry_policy(fast_policy());

        let mut ctx = RequestContext::get("http://bad host/health");
        let err = pipeline.send(&mut ctx).await.unwrap_err();

        assert_eq!(err.code, Some(ErrorCode::Request));
        assert!(err.response.is_none());
        assert_eq!(FailureKind::classify(&err), FailureKind::NetworkUnreachable);
        assert_eq!(ctx.retry_count(), 3);
    }
}
