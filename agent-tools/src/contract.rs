//! The contract every callable capability implements.

use std::any::Any;
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::time::Instant;

use async_trait::async_trait;
use futures::FutureExt;
use serde_json::Value;
use tracing::{debug, warn};

use crate::call::Arguments;
use crate::error::{ToolResult, ValidationError};
use crate::outcome::ExecutionOutcome;
use crate::schema::ToolSchema;

/// Capability that can be registered and invoked by the executor.
///
/// Implementors provide a schema and a fallible [`run`](Tool::run) body. The
/// provided [`execute`](Tool::execute) wraps `run` so that it always returns
/// an [`ExecutionOutcome`]: errors and panics become failed outcomes carrying
/// the time spent up to the failure.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Returns the published schema. Must stay constant for the tool's lifetime.
    fn schema(&self) -> &ToolSchema;

    /// Returns the stable, unique identifier.
    fn name(&self) -> &str {
        self.schema().name()
    }

    /// Returns the model-facing description.
    fn description(&self) -> &str {
        self.schema().description()
    }

    /// Structural check of arguments against the schema.
    ///
    /// Must be side-effect free. Override to add tool specific constraints,
    /// usually after delegating to the schema.
    ///
    /// # Errors
    ///
    /// Returns the [`ValidationError`] describing the first mismatch.
    fn validate_parameters(&self, arguments: &Arguments) -> Result<(), ValidationError> {
        self.schema().validate(arguments)
    }

    /// Performs the capability's side effect.
    ///
    /// # Errors
    ///
    /// Returns a [`ToolError`](crate::ToolError) describing why the call failed.
    async fn run(&self, arguments: Arguments) -> ToolResult<Value>;

    /// Runs the tool, timing it and converting every failure into an outcome.
    async fn execute(&self, arguments: Arguments) -> ExecutionOutcome {
        let started = Instant::now();
        debug!(tool = self.name(), "executing tool");

        match AssertUnwindSafe(self.run(arguments)).catch_unwind().await {
            Ok(Ok(result)) => {
                let outcome = ExecutionOutcome::success(self.name(), result, started.elapsed());
                debug!(
                    tool = self.name(),
                    elapsed = outcome.execution_time_seconds(),
                    "tool executed successfully"
                );
                outcome
            }
            Ok(Err(err)) => {
                let outcome = ExecutionOutcome::failure(self.name(), err.to_string(), started.elapsed());
                warn!(
                    tool = self.name(),
                    error = %err,
                    elapsed = outcome.execution_time_seconds(),
                    "tool execution failed"
                );
                outcome
            }
            Err(panic) => {
                let reason = panic_message(panic.as_ref());
                warn!(tool = self.name(), reason = %reason, "tool panicked");
                ExecutionOutcome::failure(
                    self.name(),
                    format!("tool {} panicked: {reason}", self.name()),
                    started.elapsed(),
                )
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_owned()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_owned()
    }
}

/// Tool assembled from a schema and an async closure.
pub struct FnTool<F> {
    schema: ToolSchema,
    body: F,
}

impl<F, Fut> FnTool<F>
where
    F: Fn(Arguments) -> Fut + Send + Sync,
    Fut: Future<Output = ToolResult<Value>> + Send,
{
    /// Wraps the closure as a tool publishing the supplied schema.
    #[must_use]
    pub fn new(schema: ToolSchema, body: F) -> Self {
        Self { schema, body }
    }
}

impl<F> fmt::Debug for FnTool<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnTool")
            .field("name", &self.schema.name())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl<F, Fut> Tool for FnTool<F>
where
    F: Fn(Arguments) -> Fut + Send + Sync,
    Fut: Future<Output = ToolResult<Value>> + Send,
{
    fn schema(&self) -> &ToolSchema {
        &self.schema
    }

    async fn run(&self, arguments: Arguments) -> ToolResult<Value> {
        (self.body)(arguments).await
    }
}
