//! Runs one request through the built-in tools with a scripted provider.
//!
//! ```text
//! basic-tools "calculate 2 ** 10; compute sqrt(2); summarize the logs"
//! ```

mod provider;

use std::path::PathBuf;
use std::sync::Arc;

use agent_config::ConfigLoader;
use agent_kernel::{RequestOrchestrator, TracingRequestSink};
use agent_tools::builtin::register_builtin_tools;
use agent_tools::{ToolExecutor, ToolRegistry};
use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use crate::provider::ScriptedProvider;

#[derive(Debug, Parser)]
#[command(name = "basic-tools", about = "Answer a request using the built-in tools")]
struct Cli {
    /// TOML settings file layered over `./tool-caller.toml`.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log file, also read by the `log_analysis` tool.
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Raise log verbosity (-v debug, -vv trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Request text; `;` separates independent asks.
    request: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut settings = ConfigLoader::load(cli.config.as_deref())?;
    if let Some(path) = cli.log_file {
        settings.logging.file = Some(path);
    }
    match cli.verbose {
        0 => {}
        1 => settings.logging.level = "debug".to_owned(),
        _ => settings.logging.level = "trace".to_owned(),
    }
    let _telemetry = agent_telemetry::init(&settings.logging)?;

    let registry = Arc::new(ToolRegistry::new());
    register_builtin_tools(&registry, &settings.builtin_options())
        .context("failed to register built-in tools")?;
    let executor = ToolExecutor::with_config(registry, settings.executor.to_executor_config()?);
    let orchestrator = RequestOrchestrator::with_executor(Arc::new(ScriptedProvider), executor)
        .with_sink(Arc::new(TracingRequestSink));

    info!(request = %cli.request, "running request");
    let outcome = orchestrator
        .handle(&cli.request)
        .await
        .context("request failed")?;

    println!("{}", outcome.response());
    for tool in outcome.tool_outcomes() {
        let status = if tool.is_success() { "ok" } else { "failed" };
        println!(
            "  [{status}] {} ({:.4}s)",
            tool.tool_name(),
            tool.execution_time_seconds()
        );
    }

    Ok(())
}
