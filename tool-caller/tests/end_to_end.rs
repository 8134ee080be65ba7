use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};
use tool_caller::kernel::{CollectingSink, synthesis_prompt};
use tool_caller::prelude::*;
use tool_caller::tools::builtin::{BuiltinOptions, register_builtin_tools};

fn args(value: Value) -> Arguments {
    value.as_object().cloned().unwrap_or_default()
}

fn add_tool() -> impl Tool + 'static {
    let schema = ToolSchema::new("add", "Adds two integers")
        .unwrap()
        .with_parameter(ParameterSchema::required("a", ParameterType::Integer))
        .unwrap()
        .with_parameter(ParameterSchema::required("b", ParameterType::Integer))
        .unwrap();
    FnTool::new(schema, |args: Arguments| async move {
        let a = args["a"].as_i64().unwrap_or_default();
        let b = args["b"].as_i64().unwrap_or_default();
        Ok(json!({ "sum": a + b }))
    })
}

fn boom_tool() -> impl Tool + 'static {
    let schema = ToolSchema::new("boom", "Always fails").unwrap();
    FnTool::new(schema, |_args: Arguments| async move {
        Err::<Value, _>(ToolError::execution("boom always fails"))
    })
}

fn sleepy_tool(name: String, delay: Duration, runs: Arc<AtomicUsize>) -> impl Tool + 'static {
    let schema = ToolSchema::new(name, "Sleeps before answering").unwrap();
    FnTool::new(schema, move |_args: Arguments| {
        let runs = runs.clone();
        async move {
            tokio::time::sleep(delay).await;
            runs.fetch_add(1, Ordering::SeqCst);
            Ok(json!(delay.as_millis()))
        }
    })
}

fn scenario_registry() -> Arc<ToolRegistry> {
    let registry = Arc::new(ToolRegistry::new());
    registry.register_tool(add_tool());
    registry.register_tool(boom_tool());
    registry
}

#[tokio::test]
async fn add_and_boom_scenario() {
    let executor = ToolExecutor::new(scenario_registry());
    let outcomes = executor
        .run(&[
            ToolCall::new("add", args(json!({ "a": 2, "b": 3 }))),
            ToolCall::new("boom", Arguments::new()),
        ])
        .await;

    assert_eq!(outcomes.len(), 2);
    assert!(outcomes[0].is_success());
    assert_eq!(outcomes[0].result(), Some(&json!({ "sum": 5 })));
    assert!(!outcomes[1].is_success());
    assert_eq!(outcomes[1].error(), Some("boom always fails"));
    assert!(outcomes.iter().all(|outcome| outcome.execution_time_seconds() >= 0.0));
}

#[tokio::test]
async fn order_follows_input_not_completion() {
    let registry = Arc::new(ToolRegistry::new());
    let runs = Arc::new(AtomicUsize::new(0));
    let delays = [40, 5, 25, 0, 15];
    let mut calls = Vec::new();
    for (index, millis) in delays.iter().enumerate() {
        let name = format!("sleepy_{index}");
        registry.register_tool(sleepy_tool(name.clone(), Duration::from_millis(*millis), runs.clone()));
        calls.push(ToolCall::new(name, Arguments::new()));
    }

    let outcomes = ToolExecutor::new(registry).run(&calls).await;

    assert_eq!(runs.load(Ordering::SeqCst), delays.len());
    for ((call, outcome), millis) in calls.iter().zip(&outcomes).zip(delays) {
        assert_eq!(outcome.tool_name(), call.name());
        assert_eq!(outcome.call_id(), Some(call.id()));
        assert_eq!(outcome.result(), Some(&json!(millis)));
    }
}

#[tokio::test]
async fn empty_batch_has_no_side_effects() {
    let registry = Arc::new(ToolRegistry::new());
    let runs = Arc::new(AtomicUsize::new(0));
    registry.register_tool(sleepy_tool("sleepy".into(), Duration::ZERO, runs.clone()));

    let outcomes = ToolExecutor::new(registry).run(&[]).await;
    assert!(outcomes.is_empty());
    assert_eq!(runs.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn unknown_and_invalid_calls_fail_without_running() {
    let registry = scenario_registry();
    let runs = Arc::new(AtomicUsize::new(0));
    registry.register_tool(sleepy_tool("sleepy".into(), Duration::ZERO, runs.clone()));

    let outcomes = ToolExecutor::new(registry)
        .run(&[
            ToolCall::new("weather", Arguments::new()),
            ToolCall::new("add", args(json!({ "a": 1 }))),
            ToolCall::new("sleepy", Arguments::new()),
        ])
        .await;

    assert_eq!(outcomes[0].error(), Some("tool weather not found"));
    assert!(outcomes[0].execution_time_seconds().abs() < f64::EPSILON);
    let invalid = outcomes[1].error().unwrap();
    assert!(invalid.starts_with("invalid parameters for tool add"), "{invalid}");
    assert!(outcomes[1].execution_time_seconds().abs() < f64::EPSILON);
    assert!(outcomes[2].is_success());
    assert_eq!(runs.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn overwrite_leaves_only_the_latest_tool() {
    let registry = Arc::new(ToolRegistry::new());
    registry.register_tool(add_tool());
    let replacement = FnTool::new(
        ToolSchema::new("add", "Always answers 42").unwrap(),
        |_args: Arguments| async move { Ok(json!(42)) },
    );
    assert!(registry.register_tool(replacement).is_some());

    assert_eq!(registry.names(), ["add"]);
    let outcomes = ToolExecutor::new(registry)
        .run(&[ToolCall::new("add", Arguments::new())])
        .await;
    assert_eq!(outcomes[0].result(), Some(&json!(42)));
}

/// Provider that always asks for the calculator and the `add` tool, then
/// echoes the synthesis prompt back as its answer.
struct CalculatorFirst;

#[async_trait]
impl ReasoningProvider for CalculatorFirst {
    fn name(&self) -> &str {
        "calculator-first"
    }

    async fn decide(&self, _user_text: &str, schemas: &[ToolSchema]) -> ProviderResult<Decision> {
        if !schemas.iter().any(|schema| schema.name() == "calculate") {
            return Err(ProviderError::invalid_request("calculator is not registered"));
        }
        Ok(Decision::CallTools(vec![
            ToolCall::new("calculate", args(json!({ "expression": "2 ** 8 / 4", "precision": 1 }))),
            ToolCall::new("add", args(json!({ "a": "two", "b": 3 }))),
            ToolCall::new("calculate", args(json!({ "expression": "1 / 0" }))),
        ]))
    }

    async fn synthesize(
        &self,
        user_text: &str,
        outcomes: &[ExecutionOutcome],
    ) -> ProviderResult<String> {
        Ok(synthesis_prompt(user_text, outcomes))
    }
}

#[tokio::test]
async fn orchestrator_runs_builtin_tools_and_reports_partial_failure() {
    let registry = scenario_registry();
    register_builtin_tools(&registry, &BuiltinOptions::default()).unwrap();
    let sink = CollectingSink::new();
    let orchestrator =
        RequestOrchestrator::new(Arc::new(CalculatorFirst), registry).with_sink(sink.clone());

    let outcome = orchestrator.handle("crunch some numbers").await.unwrap();

    let outcomes = outcome.tool_outcomes();
    assert_eq!(outcomes.len(), 3);
    assert_eq!(outcomes[0].result().unwrap()["result"], json!(64.0));
    assert!(!outcomes[1].is_success());
    assert_eq!(
        outcomes[2].error(),
        Some("Invalid expression: division by zero")
    );
    assert_eq!(outcome.failure_count(), 2);
    assert!(outcome.response().starts_with("User asked: crunch some numbers\nTool results:\n"));
    assert!(outcome.response().contains("- add: Tool execution failed: invalid parameters for tool add"));
    assert!(outcome.response().ends_with("Provide a helpful response based on this information."));
    assert_eq!(sink.drain().len(), 1);
}

#[tokio::test]
async fn provider_errors_surface_as_request_failures() {
    let orchestrator = RequestOrchestrator::new(Arc::new(CalculatorFirst), scenario_registry());
    let err = orchestrator.handle("crunch").await.unwrap_err();
    assert!(matches!(
        err,
        OrchestratorError::Decide(ProviderError::InvalidRequest { .. })
    ));
}

#[tokio::test]
async fn timeouts_only_fail_the_slow_call() {
    let registry = Arc::new(ToolRegistry::new());
    let runs = Arc::new(AtomicUsize::new(0));
    registry.register_tool(sleepy_tool("slow".into(), Duration::from_secs(5), runs.clone()));
    registry.register_tool(sleepy_tool("fast".into(), Duration::ZERO, runs.clone()));

    let config = ExecutorConfig::new().with_call_timeout(Duration::from_millis(50));
    let outcomes = ToolExecutor::with_config(registry, config)
        .run(&[
            ToolCall::new("slow", Arguments::new()),
            ToolCall::new("fast", Arguments::new()),
        ])
        .await;

    assert_eq!(outcomes[0].error(), Some("tool slow timed out after 0.05s"));
    assert!(outcomes[1].is_success());
}
