//! Per-call request state
//!
//! A `RequestContext` is created by the caller for one logical call and lent
//! mutably to the pipeline. The pipeline reuses it for every retry: URL,
//! method and body never change, only the retry counter and the injected
//! Authorization header.

use bytes::Bytes;
use reqwest::Method;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use serde::Serialize;

/// One logical API call and its retry bookkeeping.
#[derive(Debug, Clone)]
pub struct RequestContext {
    request_id: String,
    method: Method,
    url: String,
    headers: HeaderMap,
    body: Option<Bytes>,
    max_retry_count: Option<u32>,
    retry_count: u32,
    /// Set while the Authorization header in `headers` was put there by the
    /// pipeline rather than by the caller.
    pub(crate) injected_authorization: bool,
}

impl RequestContext {
    /// New context for `method url`. `url` may be a path relative to the
    /// transport's base URL or an absolute URL.
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            request_id: format!("req_{}", uuid::Uuid::new_v4().as_simple()),
            method,
            url: url.into(),
            headers: HeaderMap::new(),
            body: None,
            max_retry_count: None,
            retry_count: 0,
            injected_authorization: false,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::GET, url)
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new(Method::POST, url)
    }

    /// Override the pipeline's default retry budget for this call only.
    pub fn with_max_retry_count(mut self, max: u32) -> Self {
        self.max_retry_count = Some(max);
        self
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Serialize `value` as the JSON body and set `content-type`.
    pub fn with_json<T: Serialize + ?Sized>(mut self, value: &T) -> serde_json::Result<Self> {
        let body = serde_json::to_vec(value)?;
        self.headers
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        self.body = Some(Bytes::from(body));
        Ok(self)
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    pub fn body(&self) -> Option<&Bytes> {
        self.body.as_ref()
    }

    /// Per-call retry override, if any.
    pub fn max_retry_count(&self) -> Option<u32> {
        self.max_retry_count
    }

    /// Retries performed so far on this context.
    pub fn retry_count(&self) -> u32 {
        self.retry_count
    }

    pub(crate) fn record_retry(&mut self) -> u32 {
        self.retry_count += 1;
        self.retry_count
    }
}
