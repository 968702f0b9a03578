//! OpenAI-compatible Chat Completions adapter.
//!
//! Also hosts the wire building/parsing shared with the Azure and Groq
//! adapters, which speak the same body shapes over different endpoints.

use futures::stream::BoxStream;
use futures::StreamExt;
use reqwest::header::HeaderMap;
use serde::Deserialize;
use tracing::debug;

use async_trait::async_trait;

use crate::config::TychoConfig;
use crate::error::{Result, TychoError};
use crate::types::{ChatMessage, Role, TokenUsage, ToolCallRequest};

use super::http::{bearer_headers, parse_sse_data, shared_client, status_to_error};
use super::{
    ChatCompletion, CompletionDelta, CompletionProvider, CompletionRequest, ToolCallDelta,
};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Provider for OpenAI and OpenAI-compatible endpoints.
pub struct OpenAiProvider {
    api_key: String,
    base_url: String,
}

impl OpenAiProvider {
    pub fn new(api_key: impl Into<String>, base_url: Option<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
        }
    }

    /// Construct from an explicit config (reads the `openai` entries).
    pub fn from_config(config: &TychoConfig) -> Result<Self> {
        let api_key = config
            .get_api_key("openai")
            .ok_or_else(|| TychoError::Authentication("Missing OPENAI_API_KEY".into()))?;
        Ok(Self::new(api_key, config.get_base_url("openai")))
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl CompletionProvider for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<ChatCompletion> {
        let body = build_request_body(request, false);
        debug!(model = %request.model, "openai completion");
        execute(&self.completions_url(), bearer_headers(&self.api_key), &body).await
    }

    async fn complete_stream(
        &self,
        request: &CompletionRequest,
    ) -> Result<BoxStream<'static, Result<CompletionDelta>>> {
        let body = build_request_body(request, true);
        debug!(model = %request.model, "openai streaming completion");
        execute_stream(&self.completions_url(), bearer_headers(&self.api_key), &body).await
    }
}

/// Build an OpenAI-style request body.
pub(super) fn build_request_body(request: &CompletionRequest, stream: bool) -> serde_json::Value {
    let messages = request
        .messages
        .iter()
        .map(message_to_wire)
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
    if let Some(fp) = request.params.frequency_penalty {
        obj.insert("frequency_penalty".into(), fp.into());
    }
    if let Some(pp) = request.params.presence_penalty {
        obj.insert("presence_penalty".into(), pp.into());
    }

    if !request.tools.is_empty() {
        let tool_defs: Vec<serde_json::Value> = request
            .tools
            .iter()
            .map(|t| {
                serde_json::json!({
                    "type": "function",
                    "function": {
                        "name": t.name,
                        "description": t.description,
                        "parameters": t.parameters,
                    }
                })
            })
            .collect();
        obj.insert("tools".into(), tool_defs.into());
        obj.insert(
            "tool_choice".into(),
            request.tool_choice.as_str().into(),
        );
        obj.insert(
            "parallel_tool_calls".into(),
            request.parallel_tool_calls.into(),
        );
    }

    body
}

/// Serialize one message to the chat-completion wire shape.
///
/// The loop-internal `sender` tag and timestamp never leave the process.
pub(super) fn message_to_wire(msg: &ChatMessage) -> serde_json::Value {
    match msg.role {
        Role::Tool => serde_json::json!({
            "role": "tool",
            "tool_call_id": msg.tool_call_id,
            "content": msg.content,
        }),
        Role::Assistant if msg.has_tool_calls() => {
            let tool_calls: Vec<serde_json::Value> = msg
                .tool_calls
                .iter()
                .map(|tc| {
                    serde_json::json!({
                        "id": tc.id,
                        "type": "function",
                        "function": { "name": tc.name, "arguments": tc.arguments },
                    })
                })
                .collect();
            serde_json::json!({
                "role": "assistant",
                "content": if msg.content.is_empty() {
                    serde_json::Value::Null
                } else {
                    serde_json::Value::String(msg.content.clone())
                },
                "tool_calls": tool_calls,
            })
        }
        _ => serde_json::json!({ "role": msg.role.as_str(), "content": msg.content }),
    }
}

/// POST a completion request and parse the response.
pub(super) async fn execute(
    url: &str,
    headers: HeaderMap,
    body: &serde_json::Value,
) -> Result<ChatCompletion> {
    let resp = shared_client()
        .post(url)
        .headers(headers)
        .json(body)
        .send()
        .await?;

    let status = resp.status().as_u16();
    if status != 200 {
        let body_text = resp.text().await.unwrap_or_default();
        return Err(status_to_error(status, &body_text));
    }

    let data: ChatResponseBody = resp.json().await?;
    let choice = data
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| TychoError::api(200, "No choices in completion response"))?;

    Ok(ChatCompletion {
        content: choice.message.content.unwrap_or_default(),
        tool_calls: choice
            .message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(|tc| ToolCallRequest {
                id: tc.id,
                name: tc.function.name,
                arguments: tc.function.arguments,
            })
            .collect(),
        usage: data
            .usage
            .map(|u| TokenUsage::new(u.prompt_tokens, u.completion_tokens)),
    })
}

/// POST a streaming completion request and parse the SSE delta stream.
pub(super) async fn execute_stream(
    url: &str,
    headers: HeaderMap,
    body: &serde_json::Value,
) -> Result<BoxStream<'static, Result<CompletionDelta>>> {
    let resp = shared_client()
        .post(url)
        .headers(headers)
        .json(body)
        .send()
        .await?;

    let status = resp.status().as_u16();
    if status != 200 {
        let body_text = resp.text().await.unwrap_or_default();
        return Err(status_to_error(status, &body_text));
    }

    let byte_stream = resp.bytes_stream();

    let stream = async_stream::stream! {
        let mut buffer = String::new();
        futures::pin_mut!(byte_stream);

        while let Some(chunk_result) = byte_stream.next().await {
            let chunk = match chunk_result {
                Ok(c) => c,
                Err(e) => {
                    yield Err(TychoError::Network(e));
                    break;
                }
            };

            buffer.push_str(&String::from_utf8_lossy(&chunk));

            while let Some(line_end) = buffer.find('\n') {
                let line = buffer[..line_end].trim().to_string();
                buffer = buffer[line_end + 1..].to_string();

                if line.is_empty() || line.starts_with(':') {
                    continue;
                }

                let Some(data) = parse_sse_data(&line) else {
                    continue;
                };
                match serde_json::from_str::<StreamChunkBody>(data) {
                    Ok(chunk) => {
                        let usage = chunk
                            .usage
                            .map(|u| TokenUsage::new(u.prompt_tokens, u.completion_tokens));
                        if let Some(choice) = chunk.choices.into_iter().next() {
                            yield Ok(CompletionDelta {
                                content: choice.delta.content,
                                tool_calls: choice
                                    .delta
                                    .tool_calls
                                    .unwrap_or_default()
                                    .into_iter()
                                    .map(|tc| ToolCallDelta {
                                        index: tc.index,
                                        id: tc.id,
                                        name: tc.function.as_ref().and_then(|f| f.name.clone()),
                                        arguments: tc
                                            .function
                                            .and_then(|f| f.arguments)
                                            .unwrap_or_default(),
                                    })
                                    .collect(),
                                finish_reason: choice.finish_reason,
                                usage,
                            });
                        } else if usage.is_some() {
                            yield Ok(CompletionDelta { usage, ..Default::default() });
                        }
                    }
                    Err(_) => {} // skip unparseable chunks
                }
            }
        }
    };

    Ok(Box::pin(stream))
}

// Wire response types (internal).

#[derive(Deserialize)]
struct ChatResponseBody {
    choices: Vec<ChoiceBody>,
    usage: Option<UsageBody>,
}

#[derive(Deserialize)]
struct ChoiceBody {
    message: MessageBody,
}

#[derive(Deserialize)]
struct MessageBody {
    content: Option<String>,
    tool_calls: Option<Vec<ToolCallBody>>,
}

#[derive(Deserialize)]
struct ToolCallBody {
    id: String,
    function: FunctionBody,
}

#[derive(Deserialize)]
struct FunctionBody {
    name: String,
    arguments: String,
}

#[derive(Deserialize)]
struct UsageBody {
    prompt_tokens: u32,
    completion_tokens: u32,
}

#[derive(Deserialize)]
struct StreamChunkBody {
    choices: Vec<StreamChoiceBody>,
    usage: Option<UsageBody>,
}

#[derive(Deserialize)]
struct StreamChoiceBody {
    delta: StreamDeltaBody,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct StreamDeltaBody {
    content: Option<String>,
    tool_calls: Option<Vec<StreamToolCallBody>>,
}

#[derive(Deserialize)]
struct StreamToolCallBody {
    index: usize,
    id: Option<String>,
    function: Option<StreamFunctionBody>,
}

#[derive(Deserialize)]
struct StreamFunctionBody {
    name: Option<String>,
    arguments: Option<String>,
}
