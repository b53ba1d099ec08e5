//! Session state consumed by the API client
//!
//! The auth subsystem owns the session: it writes the access token after a
//! successful login and clears it on logout. The request pipeline only reads
//! it, once per attempt, through the `SessionStore` trait so a token refreshed
//! mid-retry is picked up by the next attempt.

mod memory;

pub use memory::MemorySessionStore;

/// Read access to the current session's credentials.
///
/// Implementations must be cheap to call: the pipeline takes a snapshot on
/// every dispatch attempt.
pub trait SessionStore: Send + Sync {
    /// Current bearer token, or `None` when nobody is signed in.
    fn current_access_token(&self) -> Option<String>;
}
