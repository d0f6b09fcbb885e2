use serde::{Deserialize, Serialize};

use crate::types::{Message, MessageRole};

/// The ordered log of turns in one conversation.
///
/// Insertion order is the order in which turns are replayed to the backend. A history only
/// grows by [`MessageHistory::append`] and only shrinks by [`MessageHistory::clear`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageHistory {
    messages: Vec<Message>,
}

impl MessageHistory {
    /// Create an empty history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a turn to the end of the history.
    pub fn append(&mut self, role: MessageRole, content: impl Into<String>) {
        self.messages.push(Message::new(role, content));
    }

    /// Drop every turn.
    pub fn clear(&mut self) {
        self.messages.clear();
    }

    /// The turns in conversational order.
    pub fn as_slice(&self) -> &[Message] {
        &self.messages
    }

    /// Iterate the turns in conversational order.
    pub fn iter(&self) -> impl Iterator<Item = &Message> {
        self.messages.iter()
    }

    /// The most recent turn, if any.
    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Number of turns.
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// True when there are no turns.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}
