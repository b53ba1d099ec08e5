//! Shared types for the hospital API client workspace

mod error;
mod secret;

pub use error::{Error, Result};
pub use secret::Secret;
