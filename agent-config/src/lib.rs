//! Configuration management for tool-calling agents.
//!
//! [`Settings`] is assembled by [`ConfigLoader`] from built-in defaults, an
//! optional TOML file and `TOOL_CALLER_` environment variables.

#![warn(missing_docs, clippy::pedantic)]

mod loader;
mod settings;

pub use agent_telemetry::{LogConfig, LogRotation};
pub use loader::{ConfigLoader, ENV_PREFIX, PROJECT_CONFIG_FILE};
pub use settings::{ExecutorSettings, Settings};
