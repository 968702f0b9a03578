//! Append-only conversation memory.

use chrono::{Duration, Utc};

use crate::agent::Agent;
use crate::types::ChatMessage;

/// Ordered, append-only store of conversation turns.
///
/// Created once per conversation session and mutated only through
/// [`push`](Memory::push) / [`extend`](Memory::extend) by the owning
/// conversation's loop; insertion order is significant. Sharing one
/// instance across concurrent conversations is not supported.
#[derive(Debug, Clone, Default)]
pub struct Memory {
    messages: Vec<ChatMessage>,
}

impl Memory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a single message.
    pub fn push(&mut self, message: ChatMessage) {
        self.messages.push(message);
    }

    /// Append a batch of messages in order.
    pub fn extend(&mut self, messages: impl IntoIterator<Item = ChatMessage>) {
        self.messages.extend(messages);
    }

    /// Full dump, insertion order.
    pub fn all(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// The most recently appended message.
    pub fn last(&self) -> Option<&ChatMessage> {
        self.messages.last()
    }

    /// Messages visible to `agent`: untagged input, messages tagged to the
    /// agent itself, and messages tagged to its recorded predecessor.
    pub fn filter_for_agent(&self, agent: &Agent) -> Vec<ChatMessage> {
        self.messages
            .iter()
            .filter(|msg| match msg.sender.as_deref() {
                None => true,
                Some(sender) => {
                    sender == agent.name() || Some(sender) == agent.predecessor()
                }
            })
            .cloned()
            .collect()
    }

    /// The last `limit` messages.
    pub fn last_n(&self, limit: usize) -> &[ChatMessage] {
        let start = self.messages.len().saturating_sub(limit);
        &self.messages[start..]
    }

    /// Messages inserted within `window` of now.
    pub fn within(&self, window: Duration) -> Vec<ChatMessage> {
        let cutoff = Utc::now() - window;
        self.messages
            .iter()
            .filter(|msg| msg.timestamp.map(|t| t >= cutoff).unwrap_or(false))
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::Agent;

    #[test]
    fn filter_keeps_own_untagged_and_predecessor_messages() {
        let agent = Agent::new("Billing", "gpt-4o").with_predecessor("Triage");
        let mut memory = Memory::new();
        memory.push(ChatMessage::user("hi"));
        memory.push(ChatMessage::assistant("routing").with_sender("Triage"));
        memory.push(ChatMessage::assistant("invoice sent").with_sender("Billing"));
        memory.push(ChatMessage::assistant("unrelated").with_sender("Shipping"));

        let visible = memory.filter_for_agent(&agent);

        assert_eq!(visible.len(), 3);
        assert!(visible.iter().all(|m| m.sender.as_deref() != Some("Shipping")));
    }

    #[test]
    fn last_n_returns_suffix() {
        let mut memory = Memory::new();
        for i in 0..5 {
            memory.push(ChatMessage::user(format!("m{i}")));
        }

        let tail = memory.last_n(2);
        assert_eq!(tail.len(), 2);
        assert_eq!(tail[0].content, "m3");
        assert_eq!(tail[1].content, "m4");
        assert_eq!(memory.last_n(10).len(), 5);
    }

    #[test]
    fn within_filters_by_insertion_time() {
        let mut memory = Memory::new();
        let mut old = ChatMessage::user("old");
        old.timestamp = Some(Utc::now() - Duration::hours(2));
        memory.push(old);
        memory.push(ChatMessage::user("recent"));

        let recent = memory.within(Duration::minutes(30));
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].content, "recent");
    }
}
