//! The decide, execute, synthesize loop for a single request.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use agent_tools::{ExecutionOutcome, ToolExecutor, ToolRegistry};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::provider::{Decision, ProviderError, ReasoningProvider};
use crate::sink::RequestSink;

/// Result alias returned by [`RequestOrchestrator::handle`].
pub type OrchestratorResult<T> = Result<T, OrchestratorError>;

/// Request-level failures. Tool failures never surface here.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// The user text was empty or whitespace only.
    #[error("request text is empty")]
    EmptyRequest,

    /// The provider failed while choosing tools.
    #[error("reasoning provider failed to decide")]
    Decide(#[source] ProviderError),

    /// The provider failed while writing the final answer.
    #[error("reasoning provider failed to synthesize a response")]
    Synthesize(#[source] ProviderError),
}

/// Final answer of a request plus the tool outcomes it was built from.
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct RequestOutcome {
    response: String,
    tool_outcomes: Vec<ExecutionOutcome>,
}

impl RequestOutcome {
    /// Returns the final response text.
    #[must_use]
    pub fn response(&self) -> &str {
        &self.response
    }

    /// Returns the outcomes of the executed calls, in call order.
    #[must_use]
    pub fn tool_outcomes(&self) -> &[ExecutionOutcome] {
        &self.tool_outcomes
    }

    /// Number of calls that failed.
    #[must_use]
    pub fn failure_count(&self) -> usize {
        self.tool_outcomes
            .iter()
            .filter(|outcome| !outcome.is_success())
            .count()
    }

    /// Splits the outcome into response text and tool outcomes.
    #[must_use]
    pub fn into_parts(self) -> (String, Vec<ExecutionOutcome>) {
        (self.response, self.tool_outcomes)
    }
}

/// Drives user requests through the reasoning provider and tool executor.
#[derive(Clone)]
pub struct RequestOrchestrator {
    provider: Arc<dyn ReasoningProvider>,
    executor: ToolExecutor,
    sinks: Vec<Arc<dyn RequestSink>>,
}

impl fmt::Debug for RequestOrchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestOrchestrator")
            .field("provider", &self.provider.name())
            .field("executor", &self.executor)
            .field("sinks", &self.sinks.len())
            .finish()
    }
}

impl RequestOrchestrator {
    /// Creates an orchestrator with a default executor over `registry`.
    #[must_use]
    pub fn new(provider: Arc<dyn ReasoningProvider>, registry: Arc<ToolRegistry>) -> Self {
        Self::with_executor(provider, ToolExecutor::new(registry))
    }

    /// Creates an orchestrator around a preconfigured executor.
    #[must_use]
    pub fn with_executor(provider: Arc<dyn ReasoningProvider>, executor: ToolExecutor) -> Self {
        Self {
            provider,
            executor,
            sinks: Vec::new(),
        }
    }

    /// Adds a sink notified after every completed request.
    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn RequestSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    /// Returns the registry whose tools are offered to the provider.
    #[must_use]
    pub fn registry(&self) -> &Arc<ToolRegistry> {
        self.executor.registry()
    }

    /// Returns the executor used for tool rounds.
    #[must_use]
    pub const fn executor(&self) -> &ToolExecutor {
        &self.executor
    }

    /// Handles one user request end to end.
    ///
    /// The provider sees the schemas registered at the time of the call. A
    /// direct answer is returned as is; requested calls are executed as one
    /// batch and every outcome, failed or not, is handed to synthesis. An
    /// empty call list yields an empty response without a synthesis round.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestratorError::EmptyRequest`] for blank input and
    /// [`OrchestratorError::Decide`] or [`OrchestratorError::Synthesize`] when
    /// the provider fails. Tool failures are reported in the outcome instead.
    pub async fn handle(&self, user_text: &str) -> OrchestratorResult<RequestOutcome> {
        if user_text.trim().is_empty() {
            return Err(OrchestratorError::EmptyRequest);
        }

        let started = Instant::now();
        let schemas = self.registry().schemas();
        info!(
            provider = self.provider.name(),
            tools = schemas.len(),
            "handling request"
        );

        let decision = self
            .provider
            .decide(user_text, &schemas)
            .await
            .map_err(OrchestratorError::Decide)?;

        let outcome = match decision {
            Decision::Respond(response) => {
                debug!("provider answered directly");
                RequestOutcome {
                    response,
                    tool_outcomes: Vec::new(),
                }
            }
            Decision::CallTools(calls) if calls.is_empty() => {
                debug!("provider requested an empty tool round, skipping synthesis");
                RequestOutcome {
                    response: String::new(),
                    tool_outcomes: Vec::new(),
                }
            }
            Decision::CallTools(calls) => {
                debug!(calls = calls.len(), "provider requested tool calls");
                let tool_outcomes = self.executor.run(&calls).await;
                let response = self
                    .provider
                    .synthesize(user_text, &tool_outcomes)
                    .await
                    .map_err(OrchestratorError::Synthesize)?;
                RequestOutcome {
                    response,
                    tool_outcomes,
                }
            }
        };

        info!(
            tool_calls = outcome.tool_outcomes.len(),
            failures = outcome.failure_count(),
            elapsed_ms = started.elapsed().as_millis(),
            "request handled"
        );
        for sink in &self.sinks {
            sink.record(&outcome);
        }

        Ok(outcome)
    }
}
