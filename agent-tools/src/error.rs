//! Error types for tool definition, validation, and execution.

use thiserror::Error;

/// Result alias for tool operations.
pub type ToolResult<T> = Result<T, ToolError>;

/// Errors produced by tool definitions and tool bodies.
#[derive(Debug, Error)]
pub enum ToolError {
    /// Tool schema failed validation.
    #[error("invalid tool schema: {reason}")]
    InvalidSchema {
        /// Human-readable reason for rejection.
        reason: String,
    },

    /// Arguments were structurally valid but rejected by the tool body.
    #[error("invalid arguments: {reason}")]
    InvalidArguments {
        /// Human-readable reason for rejection.
        reason: String,
    },

    /// Tool execution failed.
    #[error("{reason}")]
    Execution {
        /// Human-readable error returned by the tool implementation.
        reason: String,
    },
}

impl ToolError {
    /// Creates a schema error from the supplied reason.
    #[must_use]
    pub fn invalid_schema(reason: impl Into<String>) -> Self {
        Self::InvalidSchema {
            reason: reason.into(),
        }
    }

    /// Creates an argument error from the supplied reason.
    #[must_use]
    pub fn invalid_arguments(reason: impl Into<String>) -> Self {
        Self::InvalidArguments {
            reason: reason.into(),
        }
    }

    /// Creates an execution error from the supplied reason.
    #[must_use]
    pub fn execution(reason: impl Into<String>) -> Self {
        Self::Execution {
            reason: reason.into(),
        }
    }
}

/// Structural mismatch between call arguments and a declared schema.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// A required parameter was absent or null.
    #[error("missing required parameter `{name}`")]
    MissingParameter {
        /// Name of the missing parameter.
        name: String,
    },

    /// A parameter value had an incompatible JSON type.
    #[error("parameter `{name}` expected {expected}, found {found}")]
    TypeMismatch {
        /// Name of the offending parameter.
        name: String,
        /// Declared type.
        expected: String,
        /// Observed JSON type.
        found: String,
    },

    /// A parameter value was outside its allowed set.
    #[error("parameter `{name}` must be one of {allowed}, found {value}")]
    NotAllowed {
        /// Name of the offending parameter.
        name: String,
        /// Observed value.
        value: String,
        /// Allowed values rendered as a list.
        allowed: String,
    },

    /// A tool specific constraint rejected the value.
    #[error("parameter `{name}` {reason}")]
    Constraint {
        /// Name of the offending parameter.
        name: String,
        /// Description of the violated constraint.
        reason: String,
    },
}

impl ValidationError {
    /// Creates a constraint violation for the named parameter.
    #[must_use]
    pub fn constraint(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Constraint {
            name: name.into(),
            reason: reason.into(),
        }
    }
}
