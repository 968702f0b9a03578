//! Run results and tool-return normalization.

use crate::agent::Agent;
use crate::types::context::ContextVariables;
use crate::types::message::ChatMessage;

/// Result of one execution-loop invocation.
///
/// Carries only the messages produced by that invocation, not the full
/// history; immutable after construction.
#[derive(Debug, Clone)]
pub struct RunResponse {
    pub messages: Vec<ChatMessage>,
    /// The agent active at termination.
    pub agent: Agent,
    /// The merged context-variable map after all tool deltas.
    pub context_variables: ContextVariables,
}

/// What a tool may hand back to the loop.
///
/// The three shapes a raw return can take; [`ToolResult::from`] is the one
/// normalization point, so the loop never pattern-matches on raw values.
#[derive(Debug, Clone)]
pub enum ToolOutcome {
    /// Plain text fed back to the model.
    Text(String),
    /// Transfer control to another agent.
    HandOff(Agent),
    /// Full result with value, optional hand-off, and context deltas.
    Structured(ToolResult),
}

impl From<String> for ToolOutcome {
    fn from(value: String) -> Self {
        ToolOutcome::Text(value)
    }
}

impl From<&str> for ToolOutcome {
    fn from(value: &str) -> Self {
        ToolOutcome::Text(value.to_string())
    }
}

impl From<Agent> for ToolOutcome {
    fn from(agent: Agent) -> Self {
        ToolOutcome::HandOff(agent)
    }
}

/// Normalized outcome of a single tool invocation.
#[derive(Debug, Clone, Default)]
pub struct ToolResult {
    /// Stringified value recorded in the tool-role message.
    pub value: String,
    /// Present when the tool signals a hand-off.
    pub agent: Option<Agent>,
    /// Context-variable delta merged into the loop's running state.
    pub context_variables: ContextVariables,
}

impl ToolResult {
    pub fn text(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            ..Self::default()
        }
    }
}

impl From<ToolOutcome> for ToolResult {
    fn from(outcome: ToolOutcome) -> Self {
        match outcome {
            ToolOutcome::Text(value) => ToolResult::text(value),
            ToolOutcome::HandOff(agent) => ToolResult {
                value: serde_json::json!({ "assistant": agent.name() }).to_string(),
                agent: Some(agent),
                context_variables: ContextVariables::new(),
            },
            ToolOutcome::Structured(result) => result,
        }
    }
}
