//! Ready-made tools shipped with the crate.
//!
//! `calculate` evaluates arithmetic expressions, `log_analysis` summarises
//! the application log configured in [`BuiltinOptions`] and `system_info`
//! reports a snapshot of the host.

mod calculator;
mod log_analysis;
mod system_info;

use std::path::PathBuf;

pub use calculator::{CalcError, CalculatorTool, Number, evaluate};
pub use log_analysis::LogAnalysisTool;
pub use system_info::{SystemInfoTool, human_size};

use crate::error::ToolResult;
use crate::registry::ToolRegistry;

/// Settings consumed by the built-in tools.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BuiltinOptions {
    /// Log file analysed by `log_analysis`.
    pub log_file: PathBuf,
}

impl Default for BuiltinOptions {
    fn default() -> Self {
        Self {
            log_file: PathBuf::from("logs/app.log"),
        }
    }
}

/// Registers every built-in tool with the registry.
///
/// # Errors
///
/// Returns an error if a built-in tool fails to construct its schema.
pub fn register_builtin_tools(registry: &ToolRegistry, options: &BuiltinOptions) -> ToolResult<()> {
    registry.register_tool(CalculatorTool::new()?);
    registry.register_tool(LogAnalysisTool::new(options.log_file.clone())?);
    registry.register_tool(SystemInfoTool::new()?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registers_every_builtin_tool() {
        let registry = ToolRegistry::new();
        register_builtin_tools(&registry, &BuiltinOptions::default()).unwrap();
        assert_eq!(registry.names(), ["calculate", "log_analysis", "system_info"]);
    }
}
