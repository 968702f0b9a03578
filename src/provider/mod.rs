//! Completion provider trait and backend adapters.

pub mod http;

pub mod azure;
pub mod groq;
pub mod openai;

use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};

use crate::agent::ToolChoice;
use crate::error::Result;
use crate::types::{ChatMessage, TokenUsage, ToolCallRequest};

/// Tool definition sent to the provider API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

/// Sampling parameters, forwarded only when set.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CompletionParams {
    pub temperature: Option<f64>,
    pub max_tokens: Option<u32>,
    pub top_p: Option<f64>,
    pub frequency_penalty: Option<f64>,
    pub presence_penalty: Option<f64>,
}

/// One request to a completion backend.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub tools: Vec<ToolDefinition>,
    pub tool_choice: ToolChoice,
    pub parallel_tool_calls: bool,
    pub params: CompletionParams,
}

/// A completed (non-streaming) chat turn.
#[derive(Debug, Clone)]
pub struct ChatCompletion {
    pub content: String,
    pub tool_calls: Vec<ToolCallRequest>,
    /// Reported usage; absent when the backend does not bill-report.
    pub usage: Option<TokenUsage>,
}

/// Incremental fragment of a tool call inside a delta stream.
///
/// Fragments for one call share an `index`; `arguments` concatenates.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolCallDelta {
    pub index: usize,
    pub id: Option<String>,
    pub name: Option<String>,
    pub arguments: String,
}

/// One delta of a streaming completion.
#[derive(Debug, Clone, Default)]
pub struct CompletionDelta {
    pub content: Option<String>,
    pub tool_calls: Vec<ToolCallDelta>,
    pub finish_reason: Option<String>,
    pub usage: Option<TokenUsage>,
}

/// A chat-completion backend.
///
/// Implementations own their request/response normalization, including
/// message-shape differences for tool-result turns.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Provider name (e.g., "openai", "groq").
    fn name(&self) -> &str;

    /// Request a completion.
    async fn complete(&self, request: &CompletionRequest) -> Result<ChatCompletion>;

    /// Request a streaming completion.
    async fn complete_stream(
        &self,
        request: &CompletionRequest,
    ) -> Result<BoxStream<'static, Result<CompletionDelta>>>;
}
