//! Tool contract, registry and concurrent executor.
//!
//! A [`Tool`] publishes a [`ToolSchema`] and an async body. Tools live in a
//! [`ToolRegistry`] and a [`ToolExecutor`] runs batches of [`ToolCall`]s
//! against it, returning one [`ExecutionOutcome`] per call in input order.
//! Failures never escape a batch; they are reported as failed outcomes.

#![warn(missing_docs, clippy::pedantic)]

pub mod builtin;
pub mod call;
pub mod contract;
pub mod error;
pub mod executor;
pub mod outcome;
pub mod registry;
pub mod schema;

pub use call::{Arguments, ToolCall};
pub use contract::{FnTool, Tool};
pub use error::{ToolError, ToolResult, ValidationError};
pub use executor::{ExecutorConfig, ToolExecutor};
pub use outcome::ExecutionOutcome;
pub use registry::ToolRegistry;
pub use schema::{ParameterSchema, ParameterType, ToolSchema};
