//! Default task pipeline.
//!
//! # State Machine (per signal, never persisted)
//! ```text
//! Received -> Analyzing -> Infeasible -> Failed
//!                     \-> Feasible -> Executing -> Completed
//!                                             \-> Failed
//! ```
//!
//! Provider problems inside the pipeline are converted into a failure
//! signal that names the stage and the reason. Only a missing LLM
//! configuration escapes as an error.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use super::{AgentContext, PipelineError, SignalError};
use crate::llm::{
    call_bounded, CapabilityProvider, LlmOptions, ProviderError, ProviderOptions, ToolDescriptor,
};
use crate::signal::Signal;
use crate::task::TaskPayload;

/// Feasibility verdict from the analysis step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feasibility {
    #[serde(default = "default_possible")]
    pub possible: bool,
    #[serde(default)]
    pub reason: Option<String>,
}

fn default_possible() -> bool {
    true
}

/// Structured analysis returned by the provider.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskAnalysis {
    #[serde(default)]
    pub feasibility: Option<Feasibility>,
    #[serde(default)]
    pub task_type: Option<Value>,
    #[serde(default)]
    pub required_capabilities: Option<Value>,
    #[serde(default)]
    pub expected_outputs: Option<Value>,
    #[serde(default)]
    pub success_criteria: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TaskAnalysis {
    /// The reason for infeasibility, if the provider said the task is impossible.
    fn infeasible_reason(&self) -> Option<String> {
        match &self.feasibility {
            Some(f) if !f.possible => Some(
                f.reason
                    .clone()
                    .unwrap_or_else(|| "Task deemed infeasible".to_string()),
            ),
            _ => None,
        }
    }
}

/// Output shape requested from the analysis call.
pub fn analysis_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "feasibility": {
                "type": "object",
                "properties": {
                    "possible": {"type": "boolean"},
                    "reason": {"type": "string"}
                },
                "required": ["possible", "reason"]
            },
            "task_type": {"type": "string"},
            "required_capabilities": {"type": "array", "items": {"type": "string"}},
            "expected_outputs": {"type": "array", "items": {"type": "string"}},
            "success_criteria": {"type": "array", "items": {"type": "string"}},
            "constraints": {"type": "array", "items": {"type": "string"}},
            "clarity": {"type": "string"}
        },
        "required": ["feasibility"]
    })
}

fn build_analysis_prompt(task: &TaskPayload) -> String {
    format!(
        r#"Analyze the following task and determine how to accomplish it.

Title: {title}
Description: {description}

Assess:
1. Whether the task is feasible with the available tools
2. Required capabilities
3. Expected outputs
4. Constraints or limitations
5. Whether the requirements are clear enough to act on

Respond with a JSON object matching the requested schema."#,
        title = task.title(),
        description = task.description(),
    )
}

fn build_execution_prompt(task: &TaskPayload, analysis: &TaskAnalysis) -> String {
    format!(
        r#"Execute the following task using the available tools.

Title: {title}
Description: {description}

## Analysis
Task type: {task_type}
Required capabilities: {capabilities}
Expected outputs: {outputs}
Success criteria: {criteria}

Select the tools that fit, apply them, and combine their results into the final output."#,
        title = task.title(),
        description = task.description(),
        task_type = summarize(analysis.task_type.as_ref()),
        capabilities = summarize(analysis.required_capabilities.as_ref()),
        outputs = summarize(analysis.expected_outputs.as_ref()),
        criteria = summarize(analysis.success_criteria.as_ref()),
    )
}

/// Strings verbatim, everything else as compact JSON.
fn summarize(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => "unspecified".to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// Decode the analysis, accepting JSON objects or JSON-encoded strings.
fn parse_analysis(content: Value) -> Result<TaskAnalysis, ProviderError> {
    let parsed = match content {
        Value::String(text) => serde_json::from_str(&text),
        other => serde_json::from_value(other),
    };
    parsed.map_err(|e| ProviderError::parse_error(format!("Malformed analysis: {}", e)))
}

async fn analyze(
    task: &TaskPayload,
    tools: &[ToolDescriptor],
    llm: &LlmOptions,
    provider: &dyn CapabilityProvider,
) -> Result<TaskAnalysis, PipelineError> {
    tracing::info!("Analyzing task '{}'", task.title());

    let options = ProviderOptions::new(llm.clone()).with_json_schema(analysis_schema());
    let response = call_bounded(provider, &build_analysis_prompt(task), tools, &options)
        .await
        .map_err(PipelineError::AnalysisProviderError)?;
    let analysis =
        parse_analysis(response.into_content()).map_err(PipelineError::AnalysisProviderError)?;

    match analysis.infeasible_reason() {
        Some(reason) => Err(PipelineError::AnalysisInfeasible(reason)),
        None => Ok(analysis),
    }
}

async fn execute(
    task: &TaskPayload,
    analysis: &TaskAnalysis,
    tools: &[ToolDescriptor],
    llm: &LlmOptions,
    provider: &dyn CapabilityProvider,
) -> Result<Value, PipelineError> {
    tracing::info!("Executing task '{}' with {} tools", task.title(), tools.len());

    let options = ProviderOptions::new(llm.clone());
    let response = call_bounded(provider, &build_execution_prompt(task, analysis), tools, &options)
        .await
        .map_err(PipelineError::ExecutionProviderError)?;
    Ok(response.into_content())
}

/// Analyze, then execute.
pub async fn run(
    task: &TaskPayload,
    tools: &[ToolDescriptor],
    llm: &LlmOptions,
    provider: &dyn CapabilityProvider,
) -> Result<Value, PipelineError> {
    let analysis = analyze(task, tools, llm, provider).await?;
    execute(task, &analysis, tools, llm, provider).await
}

/// Handle a task assignment: analyze, execute, and report the outcome.
///
/// # Errors
/// Only `MissingLlmConfiguration`; every staged failure becomes a
/// `failure` signal instead.
pub async fn handle_task_assignment(
    signal: &Signal,
    task: TaskPayload,
    ctx: &AgentContext,
) -> Result<Signal, SignalError> {
    let llm = ctx.llm_options().map_err(|e| {
        tracing::error!("Cannot handle task assignment {}: {}", signal.id, e);
        e
    })?;
    let tools = ctx.available_tools();

    match run(&task, &tools, llm, ctx.provider.as_ref()).await {
        Ok(output) => Ok(signal
            .reply(task.into_completion(output).into_payload())
            .with_metadata("completed_at", Utc::now().to_rfc3339())),
        Err(e) => {
            tracing::warn!("Task '{}' failed at {}: {}", task.title(), e.stage(), e.reason());
            let stage = e.stage().to_string();
            Ok(signal
                .reply(task.into_failure(e.to_string()).into_payload())
                .with_metadata("failed_at", Utc::now().to_rfc3339())
                .with_metadata("stage", stage))
        }
    }
}

/// Acknowledge a task as in progress. No provider call.
pub async fn handle_task_update(
    signal: &Signal,
    task: TaskPayload,
    ctx: &AgentContext,
) -> Result<Signal, SignalError> {
    ctx.llm_options()?;
    Ok(signal.reply(task.into_status_update().into_payload()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::agents::context::ToolSet;
    use crate::llm::mock::ScriptedProvider;
    use crate::llm::{ProviderErrorKind, ProviderResponse};
    use crate::signal::SchemaId;

    fn assignment() -> (Signal, TaskPayload) {
        let Value::Object(payload) = json!({
            "type": "assignment",
            "task_id": "t1",
            "objective_id": "o1",
            "title": "Fetch weather",
            "description": "Get the current temperature in Austin"
        }) else {
            unreachable!()
        };
        let task = TaskPayload::from_payload(&payload).unwrap();
        let signal = Signal::new(SchemaId::Task, payload)
            .with_sender("planner")
            .with_recipient("worker");
        (signal, task)
    }

    fn ctx(provider: Arc<ScriptedProvider>) -> AgentContext {
        let tools: ToolSet = serde_json::from_value(json!({
            "lenses": [{"name": "weather", "description": "Current weather"}],
            "prisms": [{"name": "notify"}]
        }))
        .unwrap();
        AgentContext::new(provider)
            .with_tools(tools)
            .with_llm_config(LlmOptions {
                model: Some("test-model".to_string()),
                ..LlmOptions::default()
            })
    }

    fn feasible() -> Result<ProviderResponse, ProviderError> {
        Ok(ProviderResponse::Structured(json!({
            "feasibility": {"possible": true, "reason": "weather lens available"},
            "task_type": "lookup",
            "required_capabilities": ["weather"],
            "expected_outputs": ["temperature"]
        })))
    }

    #[tokio::test]
    async fn test_assignment_end_to_end() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            feasible(),
            Ok(ProviderResponse::Structured(json!({"temp": 72}))),
        ]));
        let (signal, task) = assignment();

        let out = handle_task_assignment(&signal, task, &ctx(provider.clone()))
            .await
            .unwrap();

        let Value::Object(expected) = json!({
            "type": "completion",
            "task_id": "t1",
            "objective_id": "o1",
            "title": "Fetch weather",
            "description": "Get the current temperature in Austin",
            "status": "completed",
            "progress": 100,
            "result": {"success": true, "output": {"temp": 72}}
        }) else {
            unreachable!()
        };
        assert_eq!(out.payload, expected);
        assert_eq!(out.recipient.as_deref(), Some("planner"));
        assert_eq!(out.sender.as_deref(), Some("worker"));
        assert_ne!(out.id, signal.id);
        assert!(out.metadata.contains_key("completed_at"));
        assert_eq!(provider.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_provider_sees_tools_and_schema() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            feasible(),
            Ok(ProviderResponse::Structured(json!("done"))),
        ]));
        let (signal, task) = assignment();

        handle_task_assignment(&signal, task, &ctx(provider.clone()))
            .await
            .unwrap();

        let calls = provider.calls();
        assert_eq!(calls[0].tool_names, ["weather", "notify"]);
        assert_eq!(calls[1].tool_names, ["weather", "notify"]);

        assert!(calls[0].prompt.contains("Fetch weather"));
        assert!(calls[0].options.json_response);
        assert_eq!(calls[0].options.json_schema, Some(analysis_schema()));
        assert_eq!(calls[0].options.llm.model.as_deref(), Some("test-model"));

        assert!(calls[1].prompt.contains("Task type: lookup"));
        assert!(calls[1].prompt.contains(r#"Required capabilities: ["weather"]"#));
        assert!(calls[1].prompt.contains("Success criteria: unspecified"));
        assert!(!calls[1].options.json_response);
    }

    #[tokio::test]
    async fn test_infeasible_stops_before_execution() {
        let provider = Arc::new(ScriptedProvider::new(vec![Ok(ProviderResponse::Structured(
            json!({"feasibility": {"possible": false, "reason": "no weather tool"}}),
        ))]));
        let (signal, task) = assignment();

        let out = handle_task_assignment(&signal, task, &ctx(provider.clone()))
            .await
            .unwrap();

        assert_eq!(out.payload["type"], json!("failure"));
        assert_eq!(out.payload["status"], json!("failed"));
        assert_eq!(
            out.payload["result"],
            json!({"success": false, "error": "Failed at analysis: no weather tool"})
        );
        assert_eq!(out.metadata["stage"], json!("analysis"));
        assert!(out.metadata.contains_key("failed_at"));
        assert_eq!(provider.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_analysis_provider_error_is_staged() {
        let provider = Arc::new(ScriptedProvider::new(vec![Err(ProviderError::server_error(
            503,
            "upstream down".to_string(),
        ))]));
        let (signal, task) = assignment();

        let out = handle_task_assignment(&signal, task, &ctx(provider))
            .await
            .unwrap();

        let error = out.payload["result"]["error"].as_str().unwrap();
        assert!(error.starts_with("Failed at analysis: "));
        assert!(error.contains("upstream down"));
    }

    #[tokio::test]
    async fn test_malformed_analysis_is_an_analysis_failure() {
        let provider = Arc::new(ScriptedProvider::new(vec![Ok(ProviderResponse::Structured(
            json!("I think it is possible"),
        ))]));
        let (signal, task) = assignment();

        let out = handle_task_assignment(&signal, task, &ctx(provider))
            .await
            .unwrap();

        assert_eq!(out.metadata["stage"], json!("analysis"));
        assert!(out.payload["result"]["error"]
            .as_str()
            .unwrap()
            .contains("Malformed analysis"));
    }

    #[tokio::test]
    async fn test_execution_provider_error_is_staged() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            feasible(),
            Err(ProviderError::network_error("connection reset".to_string())),
        ]));
        let (signal, task) = assignment();

        let out = handle_task_assignment(&signal, task, &ctx(provider))
            .await
            .unwrap();

        assert_eq!(out.payload["status"], json!("failed"));
        assert_eq!(
            out.payload["result"]["error"],
            json!("Failed at execution: Network error: connection reset")
        );
        assert_eq!(out.payload["task_id"], json!("t1"));
    }

    #[tokio::test]
    async fn test_reply_shaped_responses_are_accepted() {
        let Value::Object(analysis) = json!({
            "content": "{\"feasibility\": {\"possible\": true, \"reason\": \"ok\"}}"
        }) else {
            unreachable!()
        };
        let Value::Object(execution) = json!({"content": "72F and sunny"}) else {
            unreachable!()
        };
        let provider = Arc::new(ScriptedProvider::new(vec![
            Ok(ProviderResponse::Reply(Signal::new(SchemaId::Response, analysis))),
            Ok(ProviderResponse::Reply(Signal::new(SchemaId::Response, execution))),
        ]));
        let (signal, task) = assignment();

        let out = handle_task_assignment(&signal, task, &ctx(provider))
            .await
            .unwrap();

        assert_eq!(out.payload["status"], json!("completed"));
        assert_eq!(out.payload["result"]["output"], json!("72F and sunny"));
    }

    #[tokio::test]
    async fn test_missing_llm_config_aborts_without_provider_calls() {
        let provider = Arc::new(ScriptedProvider::new(vec![feasible()]));
        let (signal, task) = assignment();
        let ctx = AgentContext::new(provider.clone());

        let err = handle_task_assignment(&signal, task, &ctx).await.unwrap_err();

        assert_eq!(err, SignalError::MissingLlmConfiguration);
        assert!(provider.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_provider_timeout_is_staged() {
        struct Hang;

        #[async_trait::async_trait]
        impl CapabilityProvider for Hang {
            async fn call(
                &self,
                _prompt: &str,
                _tools: &[ToolDescriptor],
                _options: &ProviderOptions,
            ) -> Result<crate::llm::ProviderResponse, ProviderError> {
                std::future::pending().await
            }
        }

        let (signal, task) = assignment();
        let ctx = AgentContext::new(Arc::new(Hang)).with_llm_config(LlmOptions {
            timeout_secs: Some(10),
            ..LlmOptions::default()
        });

        let out = handle_task_assignment(&signal, task, &ctx).await.unwrap();
        assert_eq!(out.metadata["stage"], json!("analysis"));
        assert!(out.payload["result"]["error"]
            .as_str()
            .unwrap()
            .starts_with(&format!("Failed at analysis: {}", ProviderErrorKind::Timeout)));
    }

    #[tokio::test]
    async fn test_update_is_idempotent() {
        let provider = Arc::new(ScriptedProvider::default());
        let ctx = ctx(provider.clone());
        let (signal, task) = assignment();

        let first = handle_task_update(&signal, task.clone(), &ctx).await.unwrap();
        let second = handle_task_update(&signal, task, &ctx).await.unwrap();

        assert_ne!(first.id, second.id);
        assert_eq!(first.payload, second.payload);
        assert_eq!(first.payload["type"], json!("status_update"));
        assert_eq!(first.payload["status"], json!("in_progress"));
        assert_eq!(first.payload["title"], json!("Fetch weather"));
        assert!(provider.calls().is_empty());
    }
}
