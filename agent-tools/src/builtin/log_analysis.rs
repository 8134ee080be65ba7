//! Summary reports over a plain-text application log.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Instant;

use async_trait::async_trait;
use regex::Regex;
use serde_json::{Map, Value, json};
use tracing::{error, info};

use crate::call::Arguments;
use crate::contract::Tool;
use crate::error::{ToolError, ToolResult, ValidationError};
use crate::schema::{ParameterSchema, ParameterType, ToolSchema};

const DEFAULT_TOP_N: i64 = 5;
const LINE_PATTERN: &str = r"^(?P<timestamp>\d{4}-\d{2}-\d{2} \d{2}:\d{2}:\d{2})?\s*(?P<level>INFO|ERROR|WARNING|DEBUG)?\s*(?P<message>.*)";

/// Counts log levels and groups the most frequent error messages.
///
/// Lines are matched against an optional `YYYY-MM-DD HH:MM:SS` timestamp,
/// an optional level keyword and the remaining message. Only `ERROR` lines
/// contribute to the top error list.
///
/// When the configured file is absent the newest rotated sibling
/// (`app.log.2024-05-01` for `app.log`) is analysed instead.
#[derive(Debug, Clone)]
pub struct LogAnalysisTool {
    schema: ToolSchema,
    log_file: PathBuf,
    pattern: Regex,
}

impl LogAnalysisTool {
    /// Creates the `log_analysis` tool reading the given file.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::InvalidSchema`] if the static schema or line
    /// pattern is rejected.
    pub fn new(log_file: impl Into<PathBuf>) -> ToolResult<Self> {
        let schema = ToolSchema::new(
            "log_analysis",
            "Analyzes the application log file and generates a report with counts of log levels and top errors.",
        )?
        .with_parameter(
            ParameterSchema::optional("top_n", ParameterType::Integer)
                .with_description("Number of top errors to return")
                .with_default(DEFAULT_TOP_N),
        )?;
        let pattern = Regex::new(LINE_PATTERN)
            .map_err(|err| ToolError::invalid_schema(format!("log line pattern: {err}")))?;

        Ok(Self {
            schema,
            log_file: log_file.into(),
            pattern,
        })
    }

    /// Returns the file analysed on every call.
    #[must_use]
    pub fn log_file(&self) -> &Path {
        &self.log_file
    }

    fn analyse(&self, contents: &str, top_n: usize) -> LogReport {
        let mut report = LogReport::default();

        for line in contents.lines() {
            report.total_lines += 1;
            let Some(captures) = self.pattern.captures(line.trim()) else {
                continue;
            };

            if let Some(timestamp) = captures.name("timestamp") {
                let timestamp = timestamp.as_str().to_owned();
                if report.first_timestamp.is_none() {
                    report.first_timestamp = Some(timestamp.clone());
                }
                report.last_timestamp = Some(timestamp);
            }

            if let Some(level) = captures.name("level") {
                report.count_level(level.as_str());
                let message = captures.name("message").map_or("", |m| m.as_str().trim());
                if level.as_str() == "ERROR" && !message.is_empty() {
                    report.count_error(message);
                }
            }
        }

        report.errors.sort_by(|a, b| b.1.cmp(&a.1));
        report.errors.truncate(top_n);
        report
    }
}

// Levels and errors keep first-seen order so equal counts rank stably.
#[derive(Debug, Default)]
struct LogReport {
    total_lines: usize,
    levels: Vec<(String, usize)>,
    errors: Vec<(String, usize)>,
    error_index: HashMap<String, usize>,
    first_timestamp: Option<String>,
    last_timestamp: Option<String>,
}

impl LogReport {
    fn count_level(&mut self, level: &str) {
        match self.levels.iter_mut().find(|(name, _)| name == level) {
            Some((_, count)) => *count += 1,
            None => self.levels.push((level.to_owned(), 1)),
        }
    }

    fn count_error(&mut self, message: &str) {
        if let Some(&slot) = self.error_index.get(message) {
            self.errors[slot].1 += 1;
        } else {
            self.error_index.insert(message.to_owned(), self.errors.len());
            self.errors.push((message.to_owned(), 1));
        }
    }

    fn into_json(self, file_path: &Path, elapsed_seconds: f64) -> Value {
        let entries: usize = self.levels.iter().map(|(_, count)| count).sum();
        let levels: Map<String, Value> = self
            .levels
            .into_iter()
            .map(|(level, count)| (level, Value::from(count)))
            .collect();
        let top_errors: Vec<Value> = self
            .errors
            .into_iter()
            .map(|(message, count)| json!({ "message": message, "count": count }))
            .collect();

        json!({
            "file_path": file_path.display().to_string(),
            "total_lines_processed": self.total_lines,
            "log_entries_with_levels": entries,
            "log_levels": levels,
            "time_range": {
                "start": self.first_timestamp,
                "end": self.last_timestamp,
            },
            "top_errors": top_errors,
            "processing_time_seconds": (elapsed_seconds * 10_000.0).round() / 10_000.0,
        })
    }
}

#[async_trait]
impl Tool for LogAnalysisTool {
    fn schema(&self) -> &ToolSchema {
        &self.schema
    }

    fn validate_parameters(&self, arguments: &Arguments) -> Result<(), ValidationError> {
        self.schema.validate(arguments)?;
        match arguments.get("top_n").and_then(Value::as_i64) {
            Some(top_n) if top_n <= 0 => Err(ValidationError::constraint(
                "top_n",
                "must be a positive integer",
            )),
            _ => Ok(()),
        }
    }

    async fn run(&self, arguments: Arguments) -> ToolResult<Value> {
        let top_n = arguments
            .get("top_n")
            .and_then(Value::as_u64)
            .unwrap_or(DEFAULT_TOP_N.unsigned_abs());
        let top_n = usize::try_from(top_n).unwrap_or(usize::MAX);
        let file_path = std::path::absolute(&self.log_file).unwrap_or_else(|_| self.log_file.clone());
        let file_path = resolve_log_file(file_path).await;

        let started = Instant::now();
        let contents = match tokio::fs::read_to_string(&file_path).await {
            Ok(contents) => contents,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                let reason = format!("Log file not found: {}", file_path.display());
                error!(path = %file_path.display(), "log file not found");
                return Err(ToolError::execution(reason));
            }
            Err(err) => {
                error!(path = %file_path.display(), error = %err, "log analysis failed");
                return Err(ToolError::execution(format!("Log analysis failed: {err}")));
            }
        };

        let report = self.analyse(&contents, top_n);
        let elapsed = started.elapsed().as_secs_f64();
        info!(
            path = %file_path.display(),
            lines = report.total_lines,
            elapsed,
            "log analysis completed"
        );

        Ok(report.into_json(&file_path, elapsed))
    }
}

// Rotated names carry a sortable period suffix, so the greatest one is the
// file currently being written.
async fn resolve_log_file(path: PathBuf) -> PathBuf {
    if tokio::fs::try_exists(&path).await.unwrap_or(false) {
        return path;
    }
    let (Some(directory), Some(name)) = (path.parent(), path.file_name()) else {
        return path;
    };
    let Ok(mut entries) = tokio::fs::read_dir(directory).await else {
        return path;
    };

    let prefix = format!("{}.", name.to_string_lossy());
    let mut newest: Option<String> = None;
    while let Ok(Some(entry)) = entries.next_entry().await {
        let candidate = entry.file_name().to_string_lossy().into_owned();
        if candidate.starts_with(&prefix) && newest.as_ref().is_none_or(|current| candidate > *current) {
            newest = Some(candidate);
        }
    }
    match newest {
        Some(name) => directory.join(name),
        None => path,
    }
}
