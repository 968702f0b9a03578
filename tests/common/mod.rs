//! Scripted mock provider shared by the integration tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use futures::stream::BoxStream;

use tycho::error::{Result, TychoError};
use tycho::provider::{
    ChatCompletion, CompletionDelta, CompletionProvider, CompletionRequest, ToolCallDelta,
};
use tycho::types::{TokenUsage, ToolCallRequest};

/// Test provider that records requests and replays queued responses.
///
/// Streaming calls replay the same queue, chopping each reply into several
/// deltas to exercise the merge path.
#[derive(Default)]
pub struct MockProvider {
    replies: Mutex<VecDeque<Result<ChatCompletion>>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl MockProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn queue_text(&self, text: &str) {
        self.replies.lock().unwrap().push_back(Ok(ChatCompletion {
            content: text.to_string(),
            tool_calls: Vec::new(),
            usage: None,
        }));
    }

    pub fn queue_text_with_usage(&self, text: &str, usage: TokenUsage) {
        self.replies.lock().unwrap().push_back(Ok(ChatCompletion {
            content: text.to_string(),
            tool_calls: Vec::new(),
            usage: Some(usage),
        }));
    }

    pub fn queue_tool_calls(&self, calls: &[(&str, &str, &str)]) {
        self.replies.lock().unwrap().push_back(Ok(ChatCompletion {
            content: String::new(),
            tool_calls: calls
                .iter()
                .map(|(id, name, arguments)| ToolCallRequest {
                    id: id.to_string(),
                    name: name.to_string(),
                    arguments: arguments.to_string(),
                })
                .collect(),
            usage: None,
        }));
    }

    pub fn queue_error(&self, error: TychoError) {
        self.replies.lock().unwrap().push_back(Err(error));
    }

    pub fn queue_content_filter_error(&self) {
        self.queue_error(TychoError::Api {
            status: 400,
            message: "blocked by moderation".into(),
            code: Some(tycho::error::ApiErrorCode::ContentFilter),
        });
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    fn next_reply(&self) -> Result<ChatCompletion> {
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| {
                Ok(ChatCompletion {
                    content: String::new(),
                    tool_calls: Vec::new(),
                    usage: None,
                })
            })
    }
}

#[async_trait]
impl CompletionProvider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<ChatCompletion> {
        self.requests.lock().unwrap().push(request.clone());
        self.next_reply()
    }

    async fn complete_stream(
        &self,
        request: &CompletionRequest,
    ) -> Result<BoxStream<'static, Result<CompletionDelta>>> {
        self.requests.lock().unwrap().push(request.clone());
        let completion = self.next_reply()?;

        let mut deltas: Vec<Result<CompletionDelta>> = Vec::new();
        if !completion.content.is_empty() {
            let mid = completion.content.len() / 2;
            let (head, tail) = completion.content.split_at(mid);
            for piece in [head, tail] {
                if !piece.is_empty() {
                    deltas.push(Ok(CompletionDelta {
                        content: Some(piece.to_string()),
                        ..Default::default()
                    }));
                }
            }
        }
        for (index, call) in completion.tool_calls.iter().enumerate() {
            let mid = call.arguments.len() / 2;
            let (head, tail) = call.arguments.split_at(mid);
            deltas.push(Ok(CompletionDelta {
                tool_calls: vec![ToolCallDelta {
                    index,
                    id: Some(call.id.clone()),
                    name: Some(call.name.clone()),
                    arguments: head.to_string(),
                }],
                ..Default::default()
            }));
            deltas.push(Ok(CompletionDelta {
                tool_calls: vec![ToolCallDelta {
                    index,
                    id: None,
                    name: None,
                    arguments: tail.to_string(),
                }],
                ..Default::default()
            }));
        }
        deltas.push(Ok(CompletionDelta {
            finish_reason: Some("stop".into()),
            usage: completion.usage,
            ..Default::default()
        }));

        Ok(Box::pin(futures::stream::iter(deltas)))
    }
}
