//! Deterministic stand-in for a language model.

use std::fmt::Write as _;

use agent_kernel::{Decision, ProviderResult, ReasoningProvider};
use agent_tools::{Arguments, ExecutionOutcome, ToolCall, ToolSchema};
use async_trait::async_trait;
use serde_json::Value;

/// Turns `;`-separated request segments into tool calls.
///
/// A segment starting with `calculate` or `compute` becomes a `calculate`
/// call over the rest of the segment; a segment mentioning `logs` becomes a
/// `log_analysis` call and one mentioning `system` becomes a `system_info`
/// call. Anything else is answered directly.
#[derive(Debug, Default)]
pub struct ScriptedProvider;

impl ScriptedProvider {
    fn plan(user_text: &str) -> Vec<ToolCall> {
        user_text
            .split(';')
            .map(str::trim)
            .filter_map(|segment| {
                let lowered = segment.to_lowercase();
                if let Some(expression) = ["calculate", "compute"]
                    .iter()
                    .find_map(|keyword| {
                        if lowered.starts_with(keyword) {
                            segment.get(keyword.len()..)
                        } else {
                            None
                        }
                    })
                {
                    let expression = expression.trim().trim_start_matches(':').trim();
                    let mut arguments = Arguments::new();
                    arguments.insert("expression".to_owned(), Value::from(expression));
                    Some(ToolCall::new("calculate", arguments))
                } else if lowered.contains("logs") {
                    Some(ToolCall::new("log_analysis", Arguments::new()))
                } else if lowered.contains("system") {
                    Some(ToolCall::new("system_info", Arguments::new()))
                } else {
                    None
                }
            })
            .collect()
    }
}

#[async_trait]
impl ReasoningProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn decide(&self, user_text: &str, schemas: &[ToolSchema]) -> ProviderResult<Decision> {
        let calls = Self::plan(user_text);
        if calls.is_empty() {
            let names: Vec<&str> = schemas.iter().map(ToolSchema::name).collect();
            return Ok(Decision::Respond(format!(
                "No tool needed for \"{user_text}\". Available tools: {}.",
                names.join(", ")
            )));
        }
        Ok(Decision::CallTools(calls))
    }

    async fn synthesize(
        &self,
        _user_text: &str,
        outcomes: &[ExecutionOutcome],
    ) -> ProviderResult<String> {
        let mut response = String::from("Here is what the tools reported:");
        for outcome in outcomes {
            let detail = match outcome.result() {
                Some(Value::Object(fields)) if fields.contains_key("result") => {
                    fields["result"].to_string()
                }
                Some(value) => value.to_string(),
                None => outcome.render_for_model(),
            };
            let _ = write!(response, "\n- {}: {detail}", outcome.tool_name());
        }
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::time::Duration;

    use serde_json::json;

    #[test]
    fn splits_requests_into_calls() {
        let calls = ScriptedProvider::plan(
            "Calculate: 2 + 2; compute sqrt(16); summarize the logs; how is the system doing",
        );
        let names: Vec<_> = calls.iter().map(ToolCall::name).collect();
        assert_eq!(names, ["calculate", "calculate", "log_analysis", "system_info"]);
        assert_eq!(calls[0].arguments()["expression"], "2 + 2");
        assert_eq!(calls[1].arguments()["expression"], "sqrt(16)");
    }

    #[tokio::test]
    async fn answers_directly_without_matching_segments() {
        let schema = ToolSchema::new("calculate", "math").unwrap();
        let decision = ScriptedProvider.decide("hello", &[schema]).await.unwrap();
        assert_eq!(
            decision,
            Decision::Respond("No tool needed for \"hello\". Available tools: calculate.".into())
        );
    }

    #[tokio::test]
    async fn summarises_outcomes() {
        let outcomes = [
            ExecutionOutcome::success(
                "calculate",
                json!({ "expression": "2 + 2", "result": 4, "precision": 4 }),
                Duration::ZERO,
            ),
            ExecutionOutcome::rejected("log_analysis", "tool log_analysis not found"),
        ];
        let response = ScriptedProvider.synthesize("", &outcomes).await.unwrap();
        assert_eq!(
            response,
            "Here is what the tools reported:\n\
             - calculate: 4\n\
             - log_analysis: Tool execution failed: tool log_analysis not found"
        );
    }
}
