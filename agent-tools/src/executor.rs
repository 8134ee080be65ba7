//! Concurrent, order-preserving execution of tool call batches.

use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::join_all;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::call::{Arguments, ToolCall};
use crate::contract::Tool;
use crate::outcome::ExecutionOutcome;
use crate::registry::ToolRegistry;

/// Optional limits applied to every batch.
///
/// Both limits are off by default: every call starts immediately and runs
/// until it finishes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecutorConfig {
    call_timeout: Option<Duration>,
    max_concurrency: Option<NonZeroUsize>,
}

impl ExecutorConfig {
    /// Creates a configuration with no limits.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            call_timeout: None,
            max_concurrency: None,
        }
    }

    /// Fails any single call that runs longer than `timeout`.
    #[must_use]
    pub const fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = Some(timeout);
        self
    }

    /// Caps how many tool bodies run at the same time.
    #[must_use]
    pub const fn with_max_concurrency(mut self, limit: NonZeroUsize) -> Self {
        self.max_concurrency = Some(limit);
        self
    }

    /// Returns the per-call timeout.
    #[must_use]
    pub const fn call_timeout(&self) -> Option<Duration> {
        self.call_timeout
    }

    /// Returns the concurrency cap.
    #[must_use]
    pub const fn max_concurrency(&self) -> Option<NonZeroUsize> {
        self.max_concurrency
    }
}

enum Slot {
    Settled(ExecutionOutcome),
    Running {
        call: ToolCall,
        started: Instant,
        handle: JoinHandle<ExecutionOutcome>,
    },
}

/// Resolves, validates, and runs batches of tool calls concurrently.
///
/// The returned outcome list always has the same length as the input and slot
/// `i` always answers `calls[i]`, whatever order the calls finish in. A failing
/// call never cancels or delays its siblings.
#[derive(Debug, Clone)]
pub struct ToolExecutor {
    registry: Arc<ToolRegistry>,
    config: ExecutorConfig,
    permits: Option<Arc<Semaphore>>,
}

impl ToolExecutor {
    /// Creates an executor without limits.
    #[must_use]
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self::with_config(registry, ExecutorConfig::default())
    }

    /// Creates an executor applying the supplied limits.
    #[must_use]
    pub fn with_config(registry: Arc<ToolRegistry>, config: ExecutorConfig) -> Self {
        let permits = config
            .max_concurrency()
            .map(|limit| Arc::new(Semaphore::new(limit.get())));
        Self {
            registry,
            config,
            permits,
        }
    }

    /// Returns the registry calls are resolved against.
    #[must_use]
    pub fn registry(&self) -> &Arc<ToolRegistry> {
        &self.registry
    }

    /// Returns the active configuration.
    #[must_use]
    pub const fn config(&self) -> ExecutorConfig {
        self.config
    }

    /// Executes every call concurrently and returns one outcome per call, in
    /// input order.
    ///
    /// Must be called from within a Tokio runtime.
    pub async fn run(&self, calls: &[ToolCall]) -> Vec<ExecutionOutcome> {
        if calls.is_empty() {
            return Vec::new();
        }

        let started = Instant::now();
        let slots: Vec<Slot> = calls.iter().map(|call| self.schedule(call)).collect();
        let outcomes = join_all(slots.into_iter().map(settle)).await;

        let failures = outcomes.iter().filter(|outcome| !outcome.is_success()).count();
        info!(
            calls = outcomes.len(),
            failures,
            elapsed = started.elapsed().as_secs_f64(),
            "tool batch completed"
        );
        outcomes
    }

    // Lookup and validation happen here, before a task is spawned, so that
    // rejected calls never enter the pool and never accrue execution time.
    fn schedule(&self, call: &ToolCall) -> Slot {
        let Some(tool) = self.registry.get(call.name()) else {
            warn!(tool = call.name(), call_id = %call.id(), "tool not found");
            return Slot::Settled(
                ExecutionOutcome::rejected(call.name(), format!("tool {} not found", call.name()))
                    .with_call_id(call.id().clone()),
            );
        };

        if let Err(err) = tool.validate_parameters(call.arguments()) {
            warn!(tool = call.name(), call_id = %call.id(), error = %err, "invalid tool parameters");
            return Slot::Settled(
                ExecutionOutcome::rejected(
                    call.name(),
                    format!("invalid parameters for tool {}: {err}", call.name()),
                )
                .with_call_id(call.id().clone()),
            );
        }

        debug!(tool = call.name(), call_id = %call.id(), "scheduling tool call");
        let handle = tokio::spawn(invoke(
            tool,
            call.name().to_owned(),
            call.arguments().clone(),
            self.config.call_timeout(),
            self.permits.clone(),
        ));

        Slot::Running {
            call: call.clone(),
            started: Instant::now(),
            handle,
        }
    }
}

async fn invoke(
    tool: Arc<dyn Tool>,
    name: String,
    arguments: Arguments,
    timeout: Option<Duration>,
    permits: Option<Arc<Semaphore>>,
) -> ExecutionOutcome {
    let _permit = match permits {
        Some(semaphore) => match semaphore.acquire_owned().await {
            Ok(permit) => Some(permit),
            Err(_) => return ExecutionOutcome::rejected(&name, "executor closed"),
        },
        None => None,
    };

    let started = Instant::now();
    let outcome = match timeout {
        Some(limit) => match tokio::time::timeout(limit, tool.execute(arguments)).await {
            Ok(outcome) => outcome,
            Err(_) => ExecutionOutcome::failure(
                &name,
                format!("tool {name} timed out after {}s", limit.as_secs_f64()),
                started.elapsed(),
            ),
        },
        None => tool.execute(arguments).await,
    };

    outcome.with_tool_name(name)
}

async fn settle(slot: Slot) -> ExecutionOutcome {
    match slot {
        Slot::Settled(outcome) => outcome,
        Slot::Running {
            call,
            started,
            handle,
        } => {
            let outcome = match handle.await {
                Ok(outcome) => outcome,
                Err(err) => {
                    warn!(tool = call.name(), call_id = %call.id(), error = %err, "tool task failed");
                    ExecutionOutcome::failure(
                        call.name(),
                        format!("tool {} task failed: {err}", call.name()),
                        started.elapsed(),
                    )
                }
            };
            if !outcome.is_success() {
                warn!(
                    tool = call.name(),
                    call_id = %call.id(),
                    error = outcome.error().unwrap_or_default(),
                    "tool call failed"
                );
            }
            outcome.with_call_id(call.id().clone())
        }
    }
}
