//! Strongly typed settings.

use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::time::Duration;

use agent_telemetry::LogConfig;
use agent_tools::ExecutorConfig;
use agent_tools::builtin::BuiltinOptions;
use anyhow::{bail, ensure};
use serde::{Deserialize, Serialize};

/// Application settings.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    /// Logging output.
    pub logging: LogConfig,
    /// Batch execution limits.
    pub executor: ExecutorSettings,
}

impl Settings {
    /// Options for the built-in tools.
    ///
    /// `log_analysis` reads the application's own log file, falling back to
    /// `logs/app.log` when file logging is disabled.
    #[must_use]
    pub fn builtin_options(&self) -> BuiltinOptions {
        match &self.logging.file {
            Some(file) => BuiltinOptions {
                log_file: file.clone(),
            },
            None => BuiltinOptions::default(),
        }
    }
}

/// Opt-in limits applied to every batch. Both are off by default.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ExecutorSettings {
    /// Maximum number of tool bodies running at once.
    pub max_concurrent_tools: Option<usize>,
    /// Per-call time limit in seconds.
    pub tool_timeout_secs: Option<f64>,
}

impl ExecutorSettings {
    /// Validates the limits and converts them into an [`ExecutorConfig`].
    ///
    /// # Errors
    ///
    /// Fails when the concurrency limit is zero or the timeout is not a
    /// positive finite number.
    pub fn to_executor_config(&self) -> anyhow::Result<ExecutorConfig> {
        let mut config = ExecutorConfig::new();

        if let Some(limit) = self.max_concurrent_tools {
            let Some(limit) = NonZeroUsize::new(limit) else {
                bail!("executor.max_concurrent_tools must be greater than zero");
            };
            config = config.with_max_concurrency(limit);
        }

        if let Some(secs) = self.tool_timeout_secs {
            ensure!(
                secs.is_finite() && secs > 0.0,
                "executor.tool_timeout_secs must be a positive number of seconds, got {secs}"
            );
            let timeout = Duration::try_from_secs_f64(secs)
                .map_err(|err| anyhow::anyhow!("executor.tool_timeout_secs: {err}"))?;
            config = config.with_call_timeout(timeout);
        }

        Ok(config)
    }
}

pub(crate) fn normalise(mut settings: Settings) -> Settings {
    // TOML has no null, so an empty path is how a file disables file logging.
    settings.logging.file = settings
        .logging
        .file
        .filter(|path: &PathBuf| !path.as_os_str().is_empty());
    settings
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_leave_executor_unbounded() {
        let config = Settings::default().executor.to_executor_config().unwrap();
        assert_eq!(config, ExecutorConfig::default());
        assert!(config.call_timeout().is_none());
        assert!(config.max_concurrency().is_none());
    }

    #[test]
    fn converts_limits() {
        let settings = ExecutorSettings {
            max_concurrent_tools: Some(5),
            tool_timeout_secs: Some(1.5),
        };
        let config = settings.to_executor_config().unwrap();
        assert_eq!(config.max_concurrency(), NonZeroUsize::new(5));
        assert_eq!(config.call_timeout(), Some(Duration::from_millis(1500)));
    }

    #[test]
    fn rejects_invalid_limits() {
        let zero = ExecutorSettings {
            max_concurrent_tools: Some(0),
            tool_timeout_secs: None,
        };
        assert!(zero.to_executor_config().is_err());

        for secs in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            let settings = ExecutorSettings {
                max_concurrent_tools: None,
                tool_timeout_secs: Some(secs),
            };
            assert!(settings.to_executor_config().is_err(), "{secs}");
        }
    }

    #[test]
    fn log_analysis_follows_log_file() {
        let mut settings = Settings::default();
        assert_eq!(settings.builtin_options().log_file, PathBuf::from("logs/app.log"));

        settings.logging.file = Some(PathBuf::from("/var/log/agent.log"));
        assert_eq!(settings.builtin_options().log_file, PathBuf::from("/var/log/agent.log"));

        settings.logging.file = Some(PathBuf::new());
        assert!(normalise(settings).logging.file.is_none());
    }
}
