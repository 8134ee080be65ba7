//! Observers notified after each completed request.

use std::sync::{Arc, Mutex, PoisonError};

use tracing::info;

use crate::orchestrator::RequestOutcome;

/// Observer used to capture request outcomes (for logging, auditing, etc.).
pub trait RequestSink: Send + Sync {
    /// Records the outcome of a completed request.
    fn record(&self, outcome: &RequestOutcome);
}

/// Sink implementation that logs to tracing.
#[derive(Debug, Default)]
pub struct TracingRequestSink;

impl RequestSink for TracingRequestSink {
    fn record(&self, outcome: &RequestOutcome) {
        let tools: Vec<&str> = outcome
            .tool_outcomes()
            .iter()
            .map(agent_tools::ExecutionOutcome::tool_name)
            .collect();
        info!(
            response = outcome.response(),
            tools = ?tools,
            failures = outcome.failure_count(),
            "request completed"
        );
    }
}

/// Sink that keeps every outcome in memory.
#[derive(Debug, Default)]
pub struct CollectingSink {
    outcomes: Mutex<Vec<RequestOutcome>>,
}

impl CollectingSink {
    /// Creates a new collecting sink.
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Removes and returns the collected outcomes.
    #[must_use]
    pub fn drain(&self) -> Vec<RequestOutcome> {
        let mut outcomes = self.outcomes.lock().unwrap_or_else(PoisonError::into_inner);
        outcomes.drain(..).collect()
    }
}

impl RequestSink for CollectingSink {
    fn record(&self, outcome: &RequestOutcome) {
        self.outcomes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(outcome.clone());
    }
}
