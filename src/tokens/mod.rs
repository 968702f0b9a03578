//! Token accounting for budgeting decisions.
//!
//! Counts are used to decide when to trim context, not for billing
//! precision; the default tokenizer is a chars/4 heuristic and callers with
//! a real tokenizer plug it in through [`Tokenizer`].

use std::sync::Arc;

use crate::types::{ChatMessage, TokenUsage};

/// Fixed framing cost per message (role markers and separators).
const MESSAGE_FRAMING_TOKENS: usize = 4;

/// Every reply is primed with an assistant header.
const REPLY_PRIMING_TOKENS: usize = 2;

/// Pluggable text tokenizer.
pub trait Tokenizer: Send + Sync {
    /// Number of tokens in `text`.
    fn count(&self, text: &str) -> usize;
}

/// Default tokenizer: one token per four characters, rounded up.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicTokenizer;

impl Tokenizer for HeuristicTokenizer {
    fn count(&self, text: &str) -> usize {
        text.chars().count().div_ceil(4)
    }
}

/// Message-aware token counter.
#[derive(Clone)]
pub struct TokenCounter {
    tokenizer: Arc<dyn Tokenizer>,
}

impl Default for TokenCounter {
    fn default() -> Self {
        Self::new(Arc::new(HeuristicTokenizer))
    }
}

impl TokenCounter {
    pub fn new(tokenizer: Arc<dyn Tokenizer>) -> Self {
        Self { tokenizer }
    }

    /// Count tokens in a text fragment; empty text counts zero.
    pub fn count_tokens(&self, text: &str) -> usize {
        if text.is_empty() {
            return 0;
        }
        self.tokenizer.count(text)
    }

    /// Count tokens for a full message list as the completion APIs bill it.
    ///
    /// Each message costs its content plus a fixed framing overhead; a
    /// message with an explicit name field pays for the name minus one
    /// token (the role marker is subsumed). The final reply priming is a
    /// flat constant.
    pub fn count_message_tokens(&self, messages: &[ChatMessage]) -> usize {
        let mut total = 0;
        for message in messages {
            total += MESSAGE_FRAMING_TOKENS;
            total += self.count_tokens(&message.content);
            for call in &message.tool_calls {
                total += self.count_tokens(&call.name);
                total += self.count_tokens(&call.arguments);
            }
            if let Some(name) = &message.tool_name {
                total += self.count_tokens(name);
                total -= 1; // role marker subsumed by the name field
            }
        }
        total + REPLY_PRIMING_TOKENS
    }

    /// Estimate usage for a request whose provider reported none.
    pub fn estimate_usage(&self, prompt: &[ChatMessage], completion_text: &str) -> TokenUsage {
        TokenUsage::new(
            self.count_message_tokens(prompt) as u32,
            self.count_tokens(completion_text) as u32,
        )
    }
}

impl std::fmt::Debug for TokenCounter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCounter").finish()
    }
}

/// Default context-window limit for a model identifier.
///
/// Unknown models get a conservative 4096.
pub fn default_token_limit(model: &str) -> usize {
    match model {
        "gpt-4" | "gpt-4o" => 8_192,
        "gpt-3.5-turbo" => 4_096,
        "gpt-3.5-turbo-16k" => 16_384,
        "claude-2" => 100_000,
        "mixtral-8x7b" | "llama-3.3-70b-versatile" => 32_768,
        _ => 4_096,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ChatMessage;

    #[test]
    fn empty_text_counts_zero() {
        let counter = TokenCounter::default();
        assert_eq!(counter.count_tokens(""), 0);
        assert!(counter.count_tokens("hello world") > 0);
    }

    #[test]
    fn message_count_matches_framing_formula_for_text_only_lists() {
        let counter = TokenCounter::default();
        let messages = vec![
            ChatMessage::system("You are helpful."),
            ChatMessage::user("What is the weather?"),
            ChatMessage::assistant("Sunny."),
        ];

        let naive: usize = messages
            .iter()
            .map(|m| counter.count_tokens(&m.content))
            .sum();
        let framed = counter.count_message_tokens(&messages);

        assert_eq!(
            framed,
            naive + MESSAGE_FRAMING_TOKENS * messages.len() + REPLY_PRIMING_TOKENS
        );
    }

    #[test]
    fn named_tool_message_pays_name_minus_discount() {
        let counter = TokenCounter::default();
        let unnamed = vec![ChatMessage::user("result")];
        let named = vec![ChatMessage::tool_result("call_1", "lookup", "result")];

        let name_tokens = counter.count_tokens("lookup");
        assert_eq!(
            counter.count_message_tokens(&named),
            counter.count_message_tokens(&unnamed) + name_tokens - 1
        );
    }

    #[test]
    fn count_is_monotonic_under_append() {
        let counter = TokenCounter::default();
        let mut messages = Vec::new();
        let mut previous = counter.count_message_tokens(&messages);

        for text in ["first", "a longer second message", "", "fourth"] {
            messages.push(ChatMessage::user(text));
            let current = counter.count_message_tokens(&messages);
            assert!(current >= previous, "count decreased on append");
            previous = current;
        }
    }

    #[test]
    fn unknown_models_fall_back_to_conservative_limit() {
        assert_eq!(default_token_limit("gpt-4o"), 8_192);
        assert_eq!(default_token_limit("some-new-model"), 4_096);
    }
}
