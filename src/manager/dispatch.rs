//! Tool-call resolution.

use tracing::{debug, warn};

use crate::agent::Agent;
use crate::tools::ToolContext;
use crate::types::{ChatMessage, ContextVariables, ToolCallRequest, ToolResult};

/// State accumulated while processing one tool-call batch.
#[derive(Debug, Default)]
pub(crate) struct PartialResponse {
    pub messages: Vec<ChatMessage>,
    /// Hand-off target, applied by the loop at the batch boundary.
    pub agent: Option<Agent>,
    pub context_variables: ContextVariables,
}

/// Execute a batch of tool calls against the active agent.
///
/// Unknown tool names produce an in-band error tool-message and the batch
/// continues. Context-variable deltas become visible to later calls in the
/// same batch; a hand-off only takes effect after the whole batch, when
/// the loop reads `PartialResponse::agent`.
pub(crate) async fn handle_tool_calls(
    tool_calls: &[ToolCallRequest],
    agent: &Agent,
    context_variables: &ContextVariables,
) -> PartialResponse {
    let mut partial = PartialResponse::default();

    for call in tool_calls {
        let Some(function) = agent.function(&call.name) else {
            warn!(tool = %call.name, agent = %agent.name(), "tool not found");
            partial.messages.push(ChatMessage::tool_result(
                &call.id,
                &call.name,
                format!("Error: Tool {} not found.", call.name),
            ));
            continue;
        };

        let args: serde_json::Value = if call.arguments.trim().is_empty() {
            serde_json::json!({})
        } else {
            match serde_json::from_str(&call.arguments) {
                Ok(serde_json::Value::Null) => serde_json::json!({}),
                Ok(value) => value,
                Err(e) => {
                    warn!(tool = %call.name, error = %e, "malformed tool arguments");
                    partial.messages.push(ChatMessage::tool_result(
                        &call.id,
                        &call.name,
                        format!("Error: invalid arguments for tool {}: {e}", call.name),
                    ));
                    continue;
                }
            }
        };
        debug!(tool = %call.name, %args, "processing tool call");

        // Earlier deltas in the batch are visible to later calls.
        let mut live_variables = context_variables.clone();
        live_variables.merge(&partial.context_variables);
        let ctx = ToolContext {
            context_variables: live_variables,
        };

        let result = match function.call(args, &ctx).await {
            Ok(outcome) => ToolResult::from(outcome),
            // Tool output is untrusted-but-forgiving text: failures are
            // reported in-band, not raised.
            Err(e) => ToolResult::text(e.to_string()),
        };

        partial
            .messages
            .push(ChatMessage::tool_result(&call.id, &call.name, &result.value));
        partial.context_variables.merge(&result.context_variables);
        if let Some(next) = result.agent {
            partial.agent = Some(next);
        }
    }

    partial
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TychoError;
    use crate::tools::{FunctionTool, ToolParameters};
    use crate::types::{Role, ToolOutcome};
    use std::sync::Arc;

    fn call(id: &str, name: &str, arguments: &str) -> ToolCallRequest {
        ToolCallRequest {
            id: id.into(),
            name: name.into(),
            arguments: arguments.into(),
        }
    }

    fn echo_tool() -> Arc<dyn crate::tools::AgentFunction> {
        Arc::new(FunctionTool::new(
            "echo",
            "Echo",
            ToolParameters::object().string("text", "Text", true).build(),
            |args, _ctx| async move {
                Ok(ToolOutcome::Text(
                    args.get("text")
                        .and_then(|v| v.as_str())
                        .unwrap_or_default()
                        .to_string(),
                ))
            },
        ))
    }

    #[tokio::test]
    async fn unknown_tool_reports_in_band_and_batch_continues() {
        let agent = Agent::new("A", "gpt-4o").with_tool(echo_tool());
        let calls = vec![
            call("call_1", "missing", "{}"),
            call("call_2", "echo", r#"{"text": "ok"}"#),
        ];

        let partial = handle_tool_calls(&calls, &agent, &ContextVariables::new()).await;

        assert_eq!(partial.messages.len(), 2);
        assert_eq!(partial.messages[0].role, Role::Tool);
        assert_eq!(
            partial.messages[0].content,
            "Error: Tool missing not found."
        );
        assert_eq!(partial.messages[1].content, "ok");
    }

    #[tokio::test]
    async fn failing_tool_is_coerced_to_error_text() {
        let agent = Agent::new("A", "gpt-4o").with_tool(Arc::new(FunctionTool::new(
            "explode",
            "Always fails",
            ToolParameters::empty(),
            |_args, _ctx| async {
                Err(TychoError::ToolExecution {
                    tool_name: "explode".into(),
                    message: "boom".into(),
                })
            },
        )));

        let partial =
            handle_tool_calls(&[call("call_1", "explode", "{}")], &agent, &Default::default())
                .await;

        assert_eq!(partial.messages.len(), 1);
        assert!(partial.messages[0].content.contains("boom"));
        assert!(partial.agent.is_none());
    }

    #[tokio::test]
    async fn later_calls_observe_earlier_context_deltas() {
        let writer = Arc::new(FunctionTool::new(
            "write",
            "Writes a context variable",
            ToolParameters::empty(),
            |_args, _ctx| async {
                Ok(ToolOutcome::Structured(ToolResult {
                    value: "written".into(),
                    agent: None,
                    context_variables: [("color", "teal")].into_iter().collect(),
                }))
            },
        ));
        let reader = Arc::new(FunctionTool::new(
            "read",
            "Reads a context variable",
            ToolParameters::empty(),
            |_args, ctx: ToolContext| async move {
                Ok(ToolOutcome::Text(
                    ctx.context_variables
                        .get("color")
                        .and_then(|v| v.as_str())
                        .unwrap_or("unset")
                        .to_string(),
                ))
            },
        ));
        let agent = Agent::new("A", "gpt-4o").with_tool(writer).with_tool(reader);

        let calls = vec![call("call_1", "write", "{}"), call("call_2", "read", "{}")];
        let partial = handle_tool_calls(&calls, &agent, &ContextVariables::new()).await;

        assert_eq!(partial.messages[1].content, "teal");
        assert_eq!(
            partial.context_variables.get("color").unwrap(),
            "teal"
        );
    }
}
