//! In-memory session store
//!
//! Holds the signed-in user's access token behind an `RwLock`. Writers are
//! the login/logout flows; readers are concurrent request attempts, which only
//! clone the token out so the lock is never held across an await point.

use std::sync::RwLock;

use common::Secret;
use tracing::{debug, info};

use crate::SessionStore;

/// Process-local session holding at most one access token.
#[derive(Default)]
pub struct MemorySessionStore {
    token: RwLock<Option<Secret<String>>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with an already authenticated session.
    pub fn with_token(token: impl Into<String>) -> Self {
        let store = Self::new();
        store.set_access_token(token);
        store
    }

    /// Store a new access token (login or token refresh).
    ///
    /// Blank tokens are treated as a logout.
    pub fn set_access_token(&self, token: impl Into<String>) {
        let token = Secret::new(token.into());
        let mut slot = self.token.write().unwrap_or_else(|e| e.into_inner());
        if token.is_blank() {
            debug!("blank access token supplied, clearing session");
            *slot = None;
        } else {
            info!("session access token updated");
            *slot = Some(token);
        }
    }

    /// Drop the current token (logout).
    pub fn clear(&self) {
        let mut slot = self.token.write().unwrap_or_else(|e| e.into_inner());
        if slot.take().is_some() {
            info!("session cleared");
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.token
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .is_some()
    }
}

impl SessionStore for MemorySessionStore {
    fn current_access_token(&self) -> Option<String> {
        self.token
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .map(|t| t.expose().clone())
    }
}

impl std::fmt::Debug for MemorySessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemorySessionStore")
            .field("authenticated", &self.is_authenticated())
            .finish()
    }
}
