//! Terminal record of one attempted tool call.

use std::time::Duration;

use agent_primitives::CallId;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Success or failure of a single tool call, including its timing.
///
/// Exactly one of `result` and `error` is populated, matching `success`.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct ExecutionOutcome {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    call_id: Option<CallId>,
    tool_name: String,
    success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    execution_time_seconds: f64,
}

impl ExecutionOutcome {
    /// Records a successful call.
    #[must_use]
    pub fn success(tool_name: impl Into<String>, result: Value, elapsed: Duration) -> Self {
        Self {
            call_id: None,
            tool_name: tool_name.into(),
            success: true,
            result: Some(result),
            error: None,
            execution_time_seconds: elapsed.as_secs_f64(),
        }
    }

    /// Records a failed call with the time spent up to the failure.
    #[must_use]
    pub fn failure(tool_name: impl Into<String>, error: impl Into<String>, elapsed: Duration) -> Self {
        Self {
            call_id: None,
            tool_name: tool_name.into(),
            success: false,
            result: None,
            error: Some(error.into()),
            execution_time_seconds: elapsed.as_secs_f64(),
        }
    }

    /// Records a failure detected before any timed execution began.
    #[must_use]
    pub fn rejected(tool_name: impl Into<String>, error: impl Into<String>) -> Self {
        Self::failure(tool_name, error, Duration::ZERO)
    }

    /// Associates the outcome with the call that produced it.
    #[must_use]
    pub fn with_call_id(mut self, call_id: CallId) -> Self {
        self.call_id = Some(call_id);
        self
    }

    /// Overrides the reported tool name.
    #[must_use]
    pub fn with_tool_name(mut self, tool_name: impl Into<String>) -> Self {
        self.tool_name = tool_name.into();
        self
    }

    /// Returns the identifier of the originating call, if known.
    #[must_use]
    pub fn call_id(&self) -> Option<&CallId> {
        self.call_id.as_ref()
    }

    /// Returns the tool name.
    #[must_use]
    pub fn tool_name(&self) -> &str {
        &self.tool_name
    }

    /// Returns `true` when the call succeeded.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.success
    }

    /// Returns the result payload of a successful call.
    #[must_use]
    pub fn result(&self) -> Option<&Value> {
        self.result.as_ref()
    }

    /// Returns the failure cause of an unsuccessful call.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Returns the wall-clock duration of the attempt in seconds.
    #[must_use]
    pub const fn execution_time_seconds(&self) -> f64 {
        self.execution_time_seconds
    }

    /// Formats the outcome as text suitable for a model prompt.
    #[must_use]
    pub fn render_for_model(&self) -> String {
        if !self.success {
            return format!(
                "Tool execution failed: {}",
                self.error.as_deref().unwrap_or("unknown error")
            );
        }

        match &self.result {
            Some(value @ Value::Object(_)) => {
                serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
            }
            Some(Value::String(text)) => text.clone(),
            Some(value) => value.to_string(),
            None => String::new(),
        }
    }
}
