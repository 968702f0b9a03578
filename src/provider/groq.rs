//! Groq inference adapter.

use async_trait::async_trait;
use futures::stream::BoxStream;
use tracing::debug;

use crate::config::TychoConfig;
use crate::error::{Result, TychoError};
use crate::types::{ChatMessage, Role};

use super::http::bearer_headers;
use super::openai::{execute, execute_stream, message_to_wire};
use super::{ChatCompletion, CompletionDelta, CompletionProvider, CompletionRequest};

const DEFAULT_BASE_URL: &str = "https://api.groq.com/openai/v1";

/// Groq provider.
///
/// Speaks the OpenAI body shapes but has no native tool support: tool
/// definitions and the related knobs are stripped from requests, and
/// tool-result turns are rewritten as plain assistant turns before they
/// leave the process.
pub struct GroqProvider {
    api_key: String,
    base_url: String,
}

impl GroqProvider {
    pub fn new(api_key: impl Into<String>, base_url: Option<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
        }
    }

    /// Construct from an explicit config (reads the `groq` entries).
    pub fn from_config(config: &TychoConfig) -> Result<Self> {
        let api_key = config
            .get_api_key("groq")
            .ok_or_else(|| TychoError::Authentication("Missing GROQ_API_KEY".into()))?;
        Ok(Self::new(api_key, config.get_base_url("groq")))
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }

    fn build_body(&self, request: &CompletionRequest, stream: bool) -> serde_json::Value {
        let messages = request
            .messages
            .iter()
            .map(|msg| message_to_wire(&normalize_message(msg)))
            .collect::<Vec<_>>();

        let mut body = serde_json::json!({
            "model": request.model,
            "messages": messages,
            "stream": stream,
        });
        let obj = body.as_object_mut().expect("body is an object");
        if let Some(temp) = request.params.temperature {
            obj.insert("temperature".into(), temp.into());
        }
        if let Some(max) = request.params.max_tokens {
            obj.insert("max_tokens".into(), max.into());
        }
        if let Some(top_p) = request.params.top_p {
            obj.insert("top_p".into(), top_p.into());
        }
        // tools / tool_choice / parallel_tool_calls intentionally absent
        body
    }
}

/// Coerce message shapes Groq cannot accept.
fn normalize_message(msg: &ChatMessage) -> ChatMessage {
    match msg.role {
        Role::Tool => {
            let tool_name = msg.tool_name.as_deref().unwrap_or("unknown");
            ChatMessage::assistant(format!("Tool '{}' response: {}", tool_name, msg.content))
        }
        Role::Assistant if msg.has_tool_calls() => {
            // Keep only the spoken content; the call records stay local.
            ChatMessage::assistant(msg.content.clone())
        }
        _ => msg.clone(),
    }
}

#[async_trait]
impl CompletionProvider for GroqProvider {
    fn name(&self) -> &str {
        "groq"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<ChatCompletion> {
        let body = self.build_body(request, false);
        debug!(model = %request.model, "groq completion");
        execute(&self.completions_url(), bearer_headers(&self.api_key), &body).await
    }

    async fn complete_stream(
        &self,
        request: &CompletionRequest,
    ) -> Result<BoxStream<'static, Result<CompletionDelta>>> {
        let body = self.build_body(request, true);
        debug!(model = %request.model, "groq streaming completion");
        execute_stream(&self.completions_url(), bearer_headers(&self.api_key), &body).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::ToolChoice;
    use crate::provider::{CompletionParams, ToolDefinition};
    use crate::types::ToolCallRequest;

    #[test]
    fn tool_messages_become_assistant_turns() {
        let normalized = normalize_message(&ChatMessage::tool_result("call_1", "lookup", "42"));
        assert_eq!(normalized.role, Role::Assistant);
        assert_eq!(normalized.content, "Tool 'lookup' response: 42");
    }

    #[test]
    fn request_body_never_carries_tools() {
        let provider = GroqProvider::new("key", None);
        let request = CompletionRequest {
            model: "llama-3.3-70b-versatile".into(),
            messages: vec![
                ChatMessage::user("hi"),
                ChatMessage::assistant_with_tool_calls(
                    "",
                    vec![ToolCallRequest {
                        id: "call_1".into(),
                        name: "lookup".into(),
                        arguments: "{}".into(),
                    }],
                ),
                ChatMessage::tool_result("call_1", "lookup", "42"),
            ],
            tools: vec![ToolDefinition {
                name: "lookup".into(),
                description: "Look up".into(),
                parameters: serde_json::json!({"type": "object"}),
            }],
            tool_choice: ToolChoice::Auto,
            parallel_tool_calls: true,
            params: CompletionParams::default(),
        };

        let body = provider.build_body(&request, false);

        assert!(body.get("tools").is_none());
        assert!(body.get("tool_choice").is_none());
        assert!(body.get("parallel_tool_calls").is_none());
        let messages = body["messages"].as_array().unwrap();
        assert!(messages
            .iter()
            .all(|m| m["role"] != "tool" && m.get("tool_calls").is_none()));
    }
}
