//! Core shared types for the tool-calling runtime.

#![warn(missing_docs, clippy::pedantic)]

mod error;
mod ids;

/// Error type and result alias shared across the workspace.
pub use error::{Error, Result};
/// Correlation token attached to every requested tool call.
pub use ids::CallId;
