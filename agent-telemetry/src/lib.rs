//! Observability setup for tool-calling agents.
//!
//! [`init`] installs the global `tracing` subscriber: an [`EnvFilter`] built
//! from [`LogConfig::level`] (or `RUST_LOG` when set), a console layer and an
//! optional plain-text file layer fed by a non-blocking writer. The file is
//! rotated on a time schedule and old files are pruned past
//! [`LogConfig::max_files`].

#![warn(missing_docs, clippy::pedantic)]

use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow};
use serde::{Deserialize, Serialize};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

/// Logging section of the application settings.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct LogConfig {
    /// Filter directive, e.g. `"info"` or `"agent_tools=debug,info"`.
    pub level: String,
    /// File receiving a copy of every event; `None` logs to the console only.
    ///
    /// With a rotation other than [`LogRotation::Never`] the active file is
    /// this path suffixed with the period, e.g. `app.log.2024-05-01`.
    pub file: Option<PathBuf>,
    /// How often the log file is rolled over.
    pub rotation: LogRotation,
    /// Rolled files to keep; `None` keeps every file.
    pub max_files: Option<usize>,
    /// Colour console output.
    pub ansi: bool,
}

/// Time schedule for rolling the log file.
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogRotation {
    /// A new file every minute.
    Minutely,
    /// A new file every hour.
    Hourly,
    /// A new file every day.
    #[default]
    Daily,
    /// A single file that is never rolled.
    Never,
}

impl LogRotation {
    fn schedule(self) -> Rotation {
        match self {
            Self::Minutely => Rotation::MINUTELY,
            Self::Hourly => Rotation::HOURLY,
            Self::Daily => Rotation::DAILY,
            Self::Never => Rotation::NEVER,
        }
    }
}

const DEFAULT_MAX_FILES: usize = 5;

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            file: Some(PathBuf::from("logs/app.log")),
            rotation: LogRotation::Daily,
            max_files: Some(DEFAULT_MAX_FILES),
            ansi: true,
        }
    }
}

impl LogConfig {
    /// Replaces the filter directive.
    #[must_use]
    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.level = level.into();
        self
    }

    /// Writes events to `path` in addition to the console.
    #[must_use]
    pub fn with_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.file = Some(path.into());
        self
    }

    /// Sets the rollover schedule and how many rolled files to keep.
    #[must_use]
    pub fn with_rotation(mut self, rotation: LogRotation, max_files: Option<usize>) -> Self {
        self.rotation = rotation;
        self.max_files = max_files;
        self
    }

    /// Disables file output.
    #[must_use]
    pub fn without_file(mut self) -> Self {
        self.file = None;
        self
    }

    /// Builds the event filter, preferring `RUST_LOG` when it is set.
    ///
    /// # Errors
    ///
    /// Fails when the active directive cannot be parsed.
    pub fn env_filter(&self) -> anyhow::Result<EnvFilter> {
        match std::env::var(EnvFilter::DEFAULT_ENV) {
            Ok(directive) if !directive.trim().is_empty() => parse_filter(&directive),
            _ => parse_filter(&self.level),
        }
    }
}

fn parse_filter(directive: &str) -> anyhow::Result<EnvFilter> {
    EnvFilter::try_new(directive).with_context(|| format!("invalid log filter `{directive}`"))
}

/// Keeps the file writer alive; buffered events are flushed on drop.
#[derive(Debug)]
#[must_use = "dropping the guard stops file logging"]
pub struct TelemetryGuard {
    _file_writer: Option<WorkerGuard>,
}

/// Installs the global subscriber described by `config`.
///
/// The returned guard must be held for as long as events should reach the
/// log file.
///
/// # Errors
///
/// Fails when the filter is invalid, the log directory cannot be created,
/// or a global subscriber is already installed.
pub fn init(config: &LogConfig) -> anyhow::Result<TelemetryGuard> {
    let filter = config.env_filter()?;
    let console = fmt::layer().with_ansi(config.ansi).with_target(true);

    let (file_layer, file_writer) = match &config.file {
        Some(path) => {
            let (directory, file_name) = split_log_path(path)?;
            std::fs::create_dir_all(directory).with_context(|| {
                format!("failed to create log directory {}", directory.display())
            })?;
            let appender = rolling_appender(config, directory, file_name)?;
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().with_ansi(false).with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file_layer)
        .try_init()
        .context("a global tracing subscriber is already installed")?;

    tracing::debug!(level = %config.level, file = ?config.file, "telemetry initialised");
    Ok(TelemetryGuard {
        _file_writer: file_writer,
    })
}

fn rolling_appender(
    config: &LogConfig,
    directory: &Path,
    file_name: &std::ffi::OsStr,
) -> anyhow::Result<RollingFileAppender> {
    let mut builder = RollingFileAppender::builder()
        .rotation(config.rotation.schedule())
        .filename_prefix(file_name.to_string_lossy());
    if let Some(max_files) = config.max_files.filter(|max| *max > 0) {
        builder = builder.max_log_files(max_files);
    }
    builder
        .build(directory)
        .with_context(|| format!("failed to open log file in {}", directory.display()))
}

fn split_log_path(path: &Path) -> anyhow::Result<(&Path, &std::ffi::OsStr)> {
    let file_name = path
        .file_name()
        .ok_or_else(|| anyhow!("log file path {} has no file name", path.display()))?;
    let directory = path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    Ok((directory, file_name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_application_layout() {
        let config = LogConfig::default();
        assert_eq!(config.level, "info");
        assert_eq!(config.file.as_deref(), Some(Path::new("logs/app.log")));
        assert_eq!(config.rotation, LogRotation::Daily);
        assert_eq!(config.max_files, Some(5));
        assert!(config.ansi);
        assert!(config.without_file().file.is_none());
    }

    #[test]
    fn parses_filter_directives() {
        assert!(parse_filter("debug").is_ok());
        assert!(parse_filter("agent_tools=trace,info").is_ok());
        assert!(parse_filter("agent_tools=loud").is_err());
    }

    #[test]
    fn splits_log_paths() {
        let (directory, name) = split_log_path(Path::new("app.log")).unwrap();
        assert_eq!(directory, Path::new("."));
        assert_eq!(name, "app.log");

        let (directory, _) = split_log_path(Path::new("logs/app.log")).unwrap();
        assert_eq!(directory, Path::new("logs"));
        assert!(split_log_path(Path::new("/")).is_err());
    }

    #[test]
    fn second_init_is_an_error() {
        let directory = std::env::temp_dir().join(format!("telemetry-{}", uuid::Uuid::new_v4()));
        let path = directory.join("app.log");
        let config = LogConfig::default().with_file(&path);

        let guard = init(&config).expect("first init succeeds");
        assert!(init(&config.clone().without_file()).is_err());
        tracing::info!("telemetry test event");
        drop(guard);

        let rolled: Vec<String> = std::fs::read_dir(&directory)
            .unwrap()
            .filter_map(Result::ok)
            .map(|entry| entry.file_name().to_string_lossy().into_owned())
            .collect();
        std::fs::remove_dir_all(&directory).ok();
        assert!(
            rolled.iter().any(|name| name.starts_with("app.log.")),
            "{rolled:?}"
        );
    }

    #[test]
    fn rotation_names_decode_from_config() {
        let config: LogConfig =
            serde_json::from_str(r#"{ "rotation": "hourly", "max_files": 3 }"#).unwrap();
        assert_eq!(config.rotation, LogRotation::Hourly);
        assert_eq!(config.max_files, Some(3));
        assert_eq!(config.level, "info");
        assert_eq!(LogRotation::Never.schedule(), Rotation::NEVER);
        assert_eq!(LogRotation::Minutely.schedule(), Rotation::MINUTELY);

        let config = LogConfig::default().with_rotation(LogRotation::Never, None);
        assert_eq!(config.rotation.schedule(), Rotation::NEVER);
        assert!(config.max_files.is_none());
    }
}
