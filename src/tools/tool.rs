//! Tool trait and closure-based tool wrapper.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;

use super::schema::ToolParameters;
use crate::agent::Agent;
use crate::error::Result;
use crate::types::{ContextVariables, ToolOutcome};

/// Context available during tool execution.
#[derive(Debug, Clone, Default)]
pub struct ToolContext {
    /// The merged context-variable map for the current turn.
    pub context_variables: ContextVariables,
}

/// A callable an agent can expose to the model.
///
/// Dispatch is name-keyed; the descriptor (name, description, parameters)
/// is fixed at registration.
#[async_trait]
pub trait AgentFunction: Send + Sync {
    /// Tool name (must match what the model calls).
    fn name(&self) -> &str;

    /// Human-readable description.
    fn description(&self) -> &str;

    /// Declared parameter schema.
    fn parameters(&self) -> &ToolParameters;

    /// Execute with parsed arguments.
    async fn call(&self, args: serde_json::Value, ctx: &ToolContext) -> Result<ToolOutcome>;
}

type ToolHandler = dyn Fn(
        serde_json::Value,
        ToolContext,
    ) -> Pin<Box<dyn Future<Output = Result<ToolOutcome>> + Send>>
    + Send
    + Sync;

/// Closure-based tool for quick tool creation.
pub struct FunctionTool {
    name: String,
    description: String,
    parameters: ToolParameters,
    handler: Arc<ToolHandler>,
}

impl FunctionTool {
    /// Create a tool from a closure.
    pub fn new<F, Fut>(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: ToolParameters,
        handler: F,
    ) -> Self
    where
        F: Fn(serde_json::Value, ToolContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<ToolOutcome>> + Send + 'static,
    {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
            handler: Arc::new(move |args, ctx| Box::pin(handler(args, ctx))),
        }
    }

    /// A parameterless tool that transfers control to `target`.
    pub fn handoff(
        name: impl Into<String>,
        description: impl Into<String>,
        target: Agent,
    ) -> Arc<dyn AgentFunction> {
        Arc::new(Self::new(
            name,
            description,
            ToolParameters::empty(),
            move |_args, _ctx| {
                let target = target.clone();
                async move { Ok(ToolOutcome::HandOff(target)) }
            },
        ))
    }
}

#[async_trait]
impl AgentFunction for FunctionTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn parameters(&self) -> &ToolParameters {
        &self.parameters
    }

    async fn call(&self, args: serde_json::Value, ctx: &ToolContext) -> Result<ToolOutcome> {
        (self.handler)(args, ctx.clone()).await
    }
}

impl std::fmt::Debug for FunctionTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FunctionTool")
            .field("name", &self.name)
            .field("description", &self.description)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn closure_tool_round_trips_arguments() {
        let tool = FunctionTool::new(
            "echo",
            "Echo the input",
            ToolParameters::object().string("text", "Text", true).build(),
            |args, _ctx| async move {
                let text = args
                    .get("text")
                    .and_then(|v| v.as_str())
                    .unwrap_or_default()
                    .to_string();
                Ok(ToolOutcome::Text(text))
            },
        );

        let outcome = tool
            .call(
                serde_json::json!({ "text": "hello" }),
                &ToolContext::default(),
            )
            .await
            .unwrap();

        match outcome {
            ToolOutcome::Text(text) => assert_eq!(text, "hello"),
            other => panic!("expected text outcome, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn handoff_tool_returns_target_agent() {
        let target = Agent::new("Specialist", "gpt-4o");
        let tool = FunctionTool::handoff("transfer_to_specialist", "Transfer", target);

        let outcome = tool
            .call(serde_json::json!({}), &ToolContext::default())
            .await
            .unwrap();

        match outcome {
            ToolOutcome::HandOff(agent) => assert_eq!(agent.name(), "Specialist"),
            other => panic!("expected hand-off, got {other:?}"),
        }
    }
}
