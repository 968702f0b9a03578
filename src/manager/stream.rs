//! Streaming execution path.

use std::collections::BTreeMap;

use futures::stream::BoxStream;
use futures::StreamExt;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::memory::Memory;
use crate::provider::CompletionDelta;
use crate::types::{ChatMessage, ContextVariables, RunResponse, ToolCallRequest};

use super::dispatch;
use super::{apology_message, apply_document_guardrail, AgentManager, RunOptions};

/// Events emitted by a streaming run.
///
/// Each assistant turn is bracketed by explicit start/end sentinels so a
/// consumer can attribute delta batches to one turn; the final event always
/// carries the full [`RunResponse`].
#[derive(Debug)]
pub enum RunEvent {
    /// An assistant turn is starting.
    TurnStart { run_id: Uuid, agent: String },
    /// One incremental delta of the current turn.
    Delta(CompletionDelta),
    /// The current assistant turn is complete.
    TurnEnd { run_id: Uuid, agent: String },
    /// Terminal event: the finished response.
    Completed(RunResponse),
}

/// Accumulates streamed deltas into one assistant message.
///
/// Content concatenates; tool-call fragments merge keyed by index, with
/// argument strings concatenated.
#[derive(Debug, Default)]
pub(crate) struct StreamedMessage {
    content: String,
    tool_calls: BTreeMap<usize, ToolCallParts>,
}

#[derive(Debug, Default)]
struct ToolCallParts {
    id: String,
    name: String,
    arguments: String,
}

impl StreamedMessage {
    pub(crate) fn merge(&mut self, delta: &CompletionDelta) {
        if let Some(text) = &delta.content {
            self.content.push_str(text);
        }
        for fragment in &delta.tool_calls {
            let parts = self.tool_calls.entry(fragment.index).or_default();
            if let Some(id) = &fragment.id {
                parts.id = id.clone();
            }
            if let Some(name) = &fragment.name {
                parts.name = name.clone();
            }
            parts.arguments.push_str(&fragment.arguments);
        }
    }

    pub(crate) fn content(&self) -> &str {
        &self.content
    }

    pub(crate) fn tool_calls(&self) -> Vec<ToolCallRequest> {
        self.tool_calls
            .values()
            .map(|parts| ToolCallRequest {
                id: parts.id.clone(),
                name: parts.name.clone(),
                arguments: parts.arguments.clone(),
            })
            .collect()
    }
}

impl AgentManager {
    /// Run one user message with incremental delta delivery.
    ///
    /// The user message is appended to `memory` up front; the turn loop
    /// then works on a private snapshot, so callers persist the produced
    /// messages from the terminal [`RunEvent::Completed`] event themselves.
    pub fn run_stream(
        &self,
        user_message: &str,
        memory: &mut Memory,
        options: RunOptions,
    ) -> BoxStream<'static, RunEvent> {
        memory.push(ChatMessage::user(user_message));

        let start_agent = options.agent.clone().unwrap_or_else(|| self.agent.clone());
        let history = memory.filter_for_agent(&start_agent);
        let completer = self.completer.clone();
        let base_context = self.context_variables.clone();

        let stream = async_stream::stream! {
            let run_id = Uuid::new_v4();
            let mut active_agent = start_agent;
            let mut context_variables = base_context;
            let mut history = history;
            let produced_from = history.len();
            let max_turns = options.max_turns.unwrap_or(usize::MAX);
            let mut turn = 0usize;

            while turn < max_turns {
                turn += 1;
                let turn_context = ContextVariables::merged(
                    active_agent.context_defaults(),
                    &context_variables,
                );

                let mut turn_history = history.clone();
                apply_document_guardrail(&active_agent, &mut turn_history);

                let mut deltas = match completer
                    .complete_stream(&active_agent, &turn_history, &turn_context, &options)
                    .await
                {
                    Ok(stream) => stream,
                    Err(e) => {
                        history.push(apology_message(&active_agent, &e));
                        break;
                    }
                };

                yield RunEvent::TurnStart {
                    run_id,
                    agent: active_agent.name().to_string(),
                };

                let mut accumulated = StreamedMessage::default();
                while let Some(delta) = deltas.next().await {
                    match delta {
                        Ok(delta) => {
                            accumulated.merge(&delta);
                            yield RunEvent::Delta(delta);
                        }
                        Err(e) => {
                            warn!(error = %e, "delta stream interrupted");
                            break;
                        }
                    }
                }

                yield RunEvent::TurnEnd {
                    run_id,
                    agent: active_agent.name().to_string(),
                };

                let tool_calls = accumulated.tool_calls();
                debug!(agent = %active_agent.name(), turn, tool_calls = tool_calls.len(), "streamed turn complete");
                history.push(
                    ChatMessage::assistant_with_tool_calls(
                        accumulated.content().to_string(),
                        tool_calls.clone(),
                    )
                    .with_sender(active_agent.name()),
                );

                if tool_calls.is_empty() || !options.execute_tools {
                    break;
                }

                let partial =
                    dispatch::handle_tool_calls(&tool_calls, &active_agent, &turn_context).await;
                history.extend(partial.messages);
                context_variables.merge(&partial.context_variables);
                if let Some(next) = partial.agent {
                    active_agent = next;
                }
            }

            yield RunEvent::Completed(RunResponse {
                messages: history[produced_from..].to_vec(),
                agent: active_agent,
                context_variables,
            });
        };

        Box::pin(stream)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::ToolCallDelta;

    #[test]
    fn merge_concatenates_content_and_tool_arguments_by_index() {
        let mut accumulated = StreamedMessage::default();

        accumulated.merge(&CompletionDelta {
            content: Some("Hel".into()),
            ..Default::default()
        });
        accumulated.merge(&CompletionDelta {
            content: Some("lo".into()),
            tool_calls: vec![ToolCallDelta {
                index: 0,
                id: Some("call_1".into()),
                name: Some("lookup".into()),
                arguments: r#"{"ci"#.into(),
            }],
            ..Default::default()
        });
        accumulated.merge(&CompletionDelta {
            tool_calls: vec![
                ToolCallDelta {
                    index: 0,
                    id: None,
                    name: None,
                    arguments: r#"ty": "Oslo"}"#.into(),
                },
                ToolCallDelta {
                    index: 1,
                    id: Some("call_2".into()),
                    name: Some("echo".into()),
                    arguments: "{}".into(),
                },
            ],
            ..Default::default()
        });

        assert_eq!(accumulated.content(), "Hello");
        let calls = accumulated.tool_calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].id, "call_1");
        assert_eq!(calls[0].name, "lookup");
        assert_eq!(calls[0].arguments, r#"{"city": "Oslo"}"#);
        assert_eq!(calls[1].name, "echo");
    }
}
