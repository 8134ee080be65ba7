//! Boundary to the external reasoning provider.

use std::fmt::Write as _;

use agent_tools::{ExecutionOutcome, ToolCall, ToolSchema};
use async_trait::async_trait;
use thiserror::Error;

/// Result alias used by reasoning providers.
pub type ProviderResult<T> = Result<T, ProviderError>;

/// Error type shared by provider implementations.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Provider is misconfigured or missing credentials.
    #[error("provider not configured: {reason}")]
    Configuration {
        /// Additional context for the failure.
        reason: String,
    },

    /// The request could not be expressed for the provider.
    #[error("invalid provider request: {reason}")]
    InvalidRequest {
        /// Reason describing why the request was rejected.
        reason: String,
    },

    /// Transport-level failures (network, protocol, etc.).
    #[error("provider transport error: {reason}")]
    Transport {
        /// Additional context about the error.
        reason: String,
    },

    /// The provider returned a malformed or unusable response.
    #[error("provider response error: {reason}")]
    Response {
        /// Additional context about the response failure.
        reason: String,
    },
}

impl ProviderError {
    /// Convenience constructor for configuration issues.
    #[must_use]
    pub fn configuration(reason: impl Into<String>) -> Self {
        Self::Configuration {
            reason: reason.into(),
        }
    }

    /// Convenience constructor for invalid requests.
    #[must_use]
    pub fn invalid_request(reason: impl Into<String>) -> Self {
        Self::InvalidRequest {
            reason: reason.into(),
        }
    }

    /// Convenience constructor for transport failures.
    #[must_use]
    pub fn transport(reason: impl Into<String>) -> Self {
        Self::Transport {
            reason: reason.into(),
        }
    }

    /// Convenience constructor for malformed responses.
    #[must_use]
    pub fn response(reason: impl Into<String>) -> Self {
        Self::Response {
            reason: reason.into(),
        }
    }
}

/// What the provider wants to do with a request.
///
/// The two variants are mutually exclusive: a decision that requests tools
/// carries no usable final text yet.
#[derive(Clone, Debug, PartialEq)]
pub enum Decision {
    /// Answer directly without calling any tool.
    Respond(String),
    /// Run these calls, then synthesize an answer from their outcomes.
    CallTools(Vec<ToolCall>),
}

impl Decision {
    /// Returns `true` when the provider requested tool calls.
    #[must_use]
    pub const fn wants_tools(&self) -> bool {
        matches!(self, Self::CallTools(_))
    }
}

/// Decision-making collaborator that picks tools and writes final answers.
///
/// Adapting provider specific wire shapes, including narrowing parameter
/// types to what the provider supports, is the implementor's job.
#[async_trait]
pub trait ReasoningProvider: Send + Sync {
    /// Short identifier used in logs (e.g. `"gemini"`).
    fn name(&self) -> &str;

    /// Chooses between a direct answer and a list of tool calls.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError`] when the provider cannot be reached or
    /// returns something unusable.
    async fn decide(&self, user_text: &str, schemas: &[ToolSchema]) -> ProviderResult<Decision>;

    /// Produces the final answer from the outcomes of the requested calls.
    ///
    /// `outcomes` is in the same order as the calls of the decision and
    /// includes failed calls with their error text.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError`] when the provider cannot be reached or
    /// returns something unusable.
    async fn synthesize(
        &self,
        user_text: &str,
        outcomes: &[ExecutionOutcome],
    ) -> ProviderResult<String>;
}

/// Builds the plain-text synthesis context for text-only providers.
#[must_use]
pub fn synthesis_prompt(user_text: &str, outcomes: &[ExecutionOutcome]) -> String {
    let mut prompt = format!("User asked: {user_text}\nTool results:\n");
    for outcome in outcomes {
        let _ = writeln!(prompt, "- {}: {}", outcome.tool_name(), outcome.render_for_model());
    }
    prompt.push_str("Provide a helpful response based on this information.");
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::time::Duration;

    use serde_json::json;

    #[test]
    fn synthesis_prompt_lists_every_outcome_in_order() {
        let outcomes = [
            ExecutionOutcome::success("calculate", json!(4), Duration::ZERO),
            ExecutionOutcome::rejected("weather", "tool weather not found"),
        ];

        assert_eq!(
            synthesis_prompt("what is 2+2 and the weather?", &outcomes),
            "User asked: what is 2+2 and the weather?\n\
             Tool results:\n\
             - calculate: 4\n\
             - weather: Tool execution failed: tool weather not found\n\
             Provide a helpful response based on this information."
        );
    }

    #[test]
    fn errors_render_their_reason() {
        let err = ProviderError::transport("connection reset");
        assert_eq!(err.to_string(), "provider transport error: connection reset");
        assert!(Decision::CallTools(Vec::new()).wants_tools());
        assert!(!Decision::Respond("hi".into()).wants_tools());
    }
}
