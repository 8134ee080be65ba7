//! Request orchestration for tool-calling agents.
//!
//! A [`RequestOrchestrator`] drives one user request through the loop
//! registry schemas → [`ReasoningProvider::decide`] → tool executor →
//! [`ReasoningProvider::synthesize`]. Tool failures are reported inline as
//! outcomes; provider failures end the request with an [`OrchestratorError`].

#![warn(missing_docs, clippy::pedantic)]

mod orchestrator;
mod provider;
mod sink;

pub use orchestrator::{OrchestratorError, OrchestratorResult, RequestOrchestrator, RequestOutcome};
pub use provider::{Decision, ProviderError, ProviderResult, ReasoningProvider, synthesis_prompt};
pub use sink::{CollectingSink, RequestSink, TracingRequestSink};
