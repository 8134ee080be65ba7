//! Concurrent tool-calling core for LLM agents.
//!
//! Bundles the workspace crates behind feature flags: the tool contract,
//! registry and executor are always available; the request orchestrator,
//! logging setup and configuration loader can be switched off.

#![warn(missing_docs, clippy::pedantic)]

/// Call identifiers and shared errors.
pub use agent_primitives as primitives;

/// Tool contract, registry, executor and built-in tools.
pub use agent_tools as tools;

/// Request orchestration (enabled by `kernel` feature).
#[cfg(feature = "kernel")]
pub use agent_kernel as kernel;

/// Logging setup (enabled by `telemetry` feature).
#[cfg(feature = "telemetry")]
pub use agent_telemetry as telemetry;

/// Layered configuration (enabled by `config` feature).
#[cfg(feature = "config")]
pub use agent_config as config;

/// Types needed by most users.
pub mod prelude {
    pub use agent_primitives::CallId;
    pub use agent_tools::{
        Arguments, ExecutionOutcome, ExecutorConfig, FnTool, ParameterSchema, ParameterType,
        Tool, ToolCall, ToolError, ToolExecutor, ToolRegistry, ToolResult, ToolSchema,
        ValidationError,
    };

    #[cfg(feature = "kernel")]
    pub use agent_kernel::{
        Decision, OrchestratorError, ProviderError, ProviderResult, ReasoningProvider,
        RequestOrchestrator, RequestOutcome,
    };
}
