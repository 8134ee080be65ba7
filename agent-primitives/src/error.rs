//! Shared error definitions for runtime primitives.

use thiserror::Error;

/// Result alias used throughout the runtime primitives.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while constructing primitive types.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
    /// The provided call identifier was rejected.
    #[error("invalid call id: {reason}")]
    InvalidCallId {
        /// Human-readable reason for rejection.
        reason: String,
    },
}
