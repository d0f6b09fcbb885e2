use serde::{Deserialize, Serialize};

use crate::types::{ContentBlock, Message, MessageRole};

/// The content of a message on the wire: a bare string or a list of content blocks.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum MessageParamContent {
    /// A simple string content.
    String(String),

    /// An array of content blocks.
    Array(Vec<ContentBlock>),
}

/// One entry of the `messages` list in a request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MessageParam {
    /// The role of the message.
    pub role: MessageRole,

    /// The content of the message.
    pub content: MessageParamContent,
}

impl MessageParam {
    /// Create a new `MessageParam` with the given content and role.
    pub fn new(content: MessageParamContent, role: MessageRole) -> Self {
        Self { content, role }
    }

    /// Create a new user `MessageParam` with a string content.
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageParamContent::String(content.into()), MessageRole::User)
    }

    /// Create a new assistant `MessageParam` with a string content.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(
            MessageParamContent::String(content.into()),
            MessageRole::Assistant,
        )
    }

    /// Create a new `MessageParam` with an array of content blocks.
    pub fn with_blocks(blocks: Vec<ContentBlock>, role: MessageRole) -> Self {
        Self::new(MessageParamContent::Array(blocks), role)
    }
}

/// Splits a history into the wire `messages` list and the system text carried by system turns.
///
/// System turns are lifted out in order and joined with blank lines; user and assistant turns
/// keep their relative order.
pub fn split_history(history: &[Message]) -> (Vec<MessageParam>, Option<String>) {
    let mut messages = Vec::with_capacity(history.len());
    let mut system = Vec::new();
    for message in history {
        match message.role() {
            MessageRole::System => system.push(message.content()),
            role => messages.push(MessageParam::new(
                MessageParamContent::String(message.content().to_string()),
                role,
            )),
        }
    }
    let system = if system.is_empty() {
        None
    } else {
        Some(system.join("\n\n"))
    };
    (messages, system)
}
