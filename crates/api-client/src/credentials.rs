//! Bearer credential injection
//!
//! Runs before every attempt, so a token refreshed (or cleared) by the auth
//! subsystem between retries takes effect on the next attempt. Public auth
//! endpoints never receive the session token.

use std::sync::Arc;

use reqwest::header::{AUTHORIZATION, HeaderValue};
use serde::Deserialize;
use session::SessionStore;
use tracing::{debug, warn};

use crate::context::RequestContext;

/// Default unauthenticated routes: account registration and the start of the
/// password-reset flow.
pub const DEFAULT_PUBLIC_ENDPOINTS: &[&str] = &["/register", "/forgot-password"];

/// Route paths that must never carry session credentials.
///
/// A target matches an endpoint when its path (query and fragment dropped,
/// absolute URLs reduced to their path) ends with the endpoint's segments,
/// so `/register` matches `register`, `/v1/register/` and
/// `https://api.example/v1/register?ref=x` but not `/preregister`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct PublicEndpoints(Vec<String>);

impl Default for PublicEndpoints {
    fn default() -> Self {
        Self::new(DEFAULT_PUBLIC_ENDPOINTS.iter().copied())
    }
}

impl PublicEndpoints {
    pub fn new<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(paths.into_iter().map(Into::into).collect())
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn matches(&self, url: &str) -> bool {
        let path = normalize(target_path(url));
        self.0.iter().any(|endpoint| {
            let endpoint = normalize(endpoint);
            !endpoint.is_empty()
                && (path == endpoint
                    || path
                        .strip_suffix(endpoint)
                        .is_some_and(|prefix| prefix.ends_with('/')))
        })
    }
}

/// Path component of a relative or absolute URL.
fn target_path(url: &str) -> &str {
    let path = match url.find("://") {
        Some(i) => {
            let after_scheme = &url[i + 3..];
            after_scheme.find('/').map_or("", |j| &after_scheme[j..])
        }
        None => url,
    };
    let end = path.find(['?', '#']).unwrap_or(path.len());
    &path[..end]
}

fn normalize(path: &str) -> &str {
    path.trim_matches('/')
}

/// Attaches `Authorization: Bearer <token>` from the session store.
pub struct CredentialInjector {
    session: Arc<dyn SessionStore>,
    public_endpoints: PublicEndpoints,
}

impl CredentialInjector {
    pub fn new(session: Arc<dyn SessionStore>, public_endpoints: PublicEndpoints) -> Self {
        Self {
            session,
            public_endpoints,
        }
    }

    pub fn public_endpoints(&self) -> &PublicEndpoints {
        &self.public_endpoints
    }

    pub(crate) fn into_session(self) -> Arc<dyn SessionStore> {
        self.session
    }

    /// Update `request`'s headers for the next attempt.
    ///
    /// Never fails: with no token, a public target, or a token that is not a
    /// valid header value, the request goes out without session credentials.
    /// With a token on a non-public target the session's bearer value
    /// replaces any Authorization header already on the request.
    pub fn apply(&self, request: &mut RequestContext) {
        if request.injected_authorization {
            request.headers_mut().remove(AUTHORIZATION);
            request.injected_authorization = false;
        }

        if self.public_endpoints.matches(request.url()) {
            debug!(url = %request.url(), "public endpoint, skipping credentials");
            return;
        }

        let Some(token) = self.session.current_access_token() else {
            debug!("no session token, sending unauthenticated");
            return;
        };

        let mut value = match HeaderValue::from_str(&format!("Bearer {token}")) {
            Ok(v) => v,
            Err(e) => {
                warn!(error = %e, "session token is not a valid header value, skipping credentials");
                return;
            }
        };
        value.set_sensitive(true);
        request.headers_mut().insert(AUTHORIZATION, value);
        request.injected_authorization = true;
    }
}
