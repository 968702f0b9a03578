//! Context-window condensation and instruction rewriting.

use tracing::warn;

use crate::agent::ToolChoice;
use crate::provider::{CompletionParams, CompletionProvider, CompletionRequest};
use crate::tokens::TokenCounter;
use crate::types::{ChatMessage, Role};

/// Messages kept verbatim at the tail when condensing.
pub const KEEP_RECENT_MESSAGES: usize = 4;

const SUMMARIZER_PROMPT: &str = "You are a conversation summarizer. Create a concise \
summary of the conversation while preserving key information.";

const REWRITER_PROMPT: &str = "You are a prompt rewriting assistant. Rewrite the given \
instructions so they comply with content moderation policies while preserving their \
intent. Reply with the rewritten instructions only.";

/// Condense a message list to fit a frozen context budget.
///
/// No-op while the list fits. Otherwise the system message (if present)
/// stays first, the most recent [`KEEP_RECENT_MESSAGES`] non-system
/// messages stay verbatim and last, and everything older is replaced by
/// one system-tagged summary produced by a model call capped at a quarter
/// of the budget. A failed summarization returns the original list
/// untrimmed.
pub async fn condense(
    provider: &dyn CompletionProvider,
    model: &str,
    messages: &[ChatMessage],
    max_context_tokens: usize,
    counter: &TokenCounter,
) -> Vec<ChatMessage> {
    if counter.count_message_tokens(messages) <= max_context_tokens {
        return messages.to_vec();
    }

    let system = messages.iter().find(|m| m.role == Role::System).cloned();
    let rest: Vec<&ChatMessage> = messages
        .iter()
        .filter(|m| m.role != Role::System)
        .collect();

    if rest.len() <= KEEP_RECENT_MESSAGES {
        return messages.to_vec();
    }

    let cut = rest.len() - KEEP_RECENT_MESSAGES;
    let transcript = rest[..cut]
        .iter()
        .map(|m| format!("{}: {}", m.role.as_str(), m.content))
        .collect::<Vec<_>>()
        .join("\n");

    let request = CompletionRequest {
        model: model.to_string(),
        messages: vec![
            ChatMessage::system(SUMMARIZER_PROMPT),
            ChatMessage::user(format!(
                "Summarize this conversation, preserving key details:\n\n{transcript}"
            )),
        ],
        tools: Vec::new(),
        tool_choice: ToolChoice::Auto,
        parallel_tool_calls: true,
        params: CompletionParams {
            max_tokens: Some((max_context_tokens / 4) as u32),
            ..Default::default()
        },
    };

    match provider.complete(&request).await {
        Ok(completion) => {
            let mut condensed = Vec::with_capacity(KEEP_RECENT_MESSAGES + 2);
            if let Some(system) = system {
                condensed.push(system);
            }
            condensed.push(ChatMessage::system(format!(
                "Previous conversation summary: {}",
                completion.content
            )));
            condensed.extend(rest[cut..].iter().map(|m| (*m).clone()));
            condensed
        }
        Err(e) => {
            warn!(error = %e, "failed to summarize context, keeping full history");
            messages.to_vec()
        }
    }
}

/// Rewrite instruction text after a content-filter rejection.
///
/// Falls back to the original text when the rewrite call fails.
pub async fn rewrite_instructions(
    provider: &dyn CompletionProvider,
    model: &str,
    instructions: &str,
) -> String {
    let request = CompletionRequest {
        model: model.to_string(),
        messages: vec![
            ChatMessage::system(REWRITER_PROMPT),
            ChatMessage::user(instructions.to_string()),
        ],
        tools: Vec::new(),
        tool_choice: ToolChoice::Auto,
        parallel_tool_calls: true,
        params: CompletionParams::default(),
    };

    match provider.complete(&request).await {
        Ok(completion) if !completion.content.is_empty() => completion.content,
        Ok(_) => instructions.to_string(),
        Err(e) => {
            warn!(error = %e, "instruction rewrite failed, keeping original");
            instructions.to_string()
        }
    }
}
