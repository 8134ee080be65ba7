//! Requested tool invocations.

use agent_primitives::CallId;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Unvalidated mapping from parameter name to value.
pub type Arguments = Map<String, Value>;

/// A single invocation requested by the reasoning provider.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct ToolCall {
    #[serde(default)]
    id: CallId,
    name: String,
    #[serde(default, deserialize_with = "arguments_from_value")]
    arguments: Arguments,
}

impl ToolCall {
    /// Creates a call with a freshly minted identifier.
    #[must_use]
    pub fn new(name: impl Into<String>, arguments: Arguments) -> Self {
        Self::with_id(CallId::random(), name, arguments)
    }

    /// Creates a call that reuses a provider supplied identifier.
    #[must_use]
    pub fn with_id(id: CallId, name: impl Into<String>, arguments: Arguments) -> Self {
        Self {
            id,
            name: name.into(),
            arguments,
        }
    }

    /// Creates a call from a JSON value, treating anything but an object as
    /// "no arguments".
    #[must_use]
    pub fn from_value(name: impl Into<String>, arguments: Value) -> Self {
        Self::new(name, coerce_arguments(arguments))
    }

    /// Returns the correlation token.
    #[must_use]
    pub fn id(&self) -> &CallId {
        &self.id
    }

    /// Returns the requested tool name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the raw arguments.
    #[must_use]
    pub fn arguments(&self) -> &Arguments {
        &self.arguments
    }
}

// Providers such as OpenAI ship arguments as a JSON-encoded string.
fn coerce_arguments(value: Value) -> Arguments {
    match value {
        Value::Object(map) => map,
        Value::String(raw) => match serde_json::from_str::<Value>(&raw) {
            Ok(Value::Object(map)) => map,
            _ => Arguments::new(),
        },
        _ => Arguments::new(),
    }
}

fn arguments_from_value<'de, D>(deserializer: D) -> Result<Arguments, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(coerce_arguments)
}
