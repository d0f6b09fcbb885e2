use std::fmt;

use serde::{Deserialize, Serialize};

/// The author of a conversational turn.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// A turn typed by the user.
    User,

    /// A turn produced by the model.
    Assistant,

    /// Instruction text that steers the assistant.
    ///
    /// The wire protocol has no system role inside the message list, so system turns are
    /// folded into the request's system prompt when a request is built.
    System,
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageRole::User => write!(f, "user"),
            MessageRole::Assistant => write!(f, "assistant"),
            MessageRole::System => write!(f, "system"),
        }
    }
}

/// One conversational turn.
///
/// A `Message` cannot be changed after construction; the fields are only reachable through
/// accessors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    role: MessageRole,
    content: String,
}

impl Message {
    /// Create a new message with the given role and content.
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    /// Create a new user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageRole::User, content)
    }

    /// Create a new assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Assistant, content)
    }

    /// Create a new system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(MessageRole::System, content)
    }

    /// The role of this message.
    pub fn role(&self) -> MessageRole {
        self.role
    }

    /// The text of this message.
    pub fn content(&self) -> &str {
        &self.content
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, to_value};

    #[test]
    fn constructors_set_role() {
        assert_eq!(Message::user("hi").role(), MessageRole::User);
        assert_eq!(Message::assistant("hello").role(), MessageRole::Assistant);
        assert_eq!(Message::system("be terse").role(), MessageRole::System);
    }

    #[test]
    fn serialization() {
        let message = Message::user("Write a palindrome checker.");
        assert_eq!(
            to_value(&message).unwrap(),
            json!({
                "role": "user",
                "content": "Write a palindrome checker."
            })
        );
    }

    #[test]
    fn role_display() {
        assert_eq!(MessageRole::User.to_string(), "user");
        assert_eq!(MessageRole::Assistant.to_string(), "assistant");
        assert_eq!(MessageRole::System.to_string(), "system");
    }
}
