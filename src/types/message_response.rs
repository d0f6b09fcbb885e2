use serde::{Deserialize, Serialize};

use crate::types::{Completion, ContentBlock, MessageRole, StopReason, Usage, concat_text};

/// The body of a successful non-streaming response, and the payload of `message_start`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MessageResponse {
    /// Unique object identifier.
    #[serde(default)]
    pub id: String,

    /// The model that handled the request.
    #[serde(default)]
    pub model: String,

    /// Conversational role of the generated message.  Always assistant.
    #[serde(default = "default_role")]
    pub role: MessageRole,

    /// Content generated by the model, in emission order.  Required: a body without it is not a
    /// message.
    pub content: Vec<ContentBlock>,

    /// The reason that generation stopped.  Absent in `message_start`.
    #[serde(default)]
    pub stop_reason: Option<StopReason>,

    /// The stop sequence that was hit, if any.
    #[serde(default)]
    pub stop_sequence: Option<String>,

    /// Billing and rate-limit usage.
    #[serde(default)]
    pub usage: Usage,
}

fn default_role() -> MessageRole {
    MessageRole::Assistant
}

impl MessageResponse {
    /// Create a response with the given content and usage.
    pub fn new(content: Vec<ContentBlock>, stop_reason: Option<StopReason>, usage: Usage) -> Self {
        Self {
            id: String::new(),
            model: String::new(),
            role: MessageRole::Assistant,
            content,
            stop_reason,
            stop_sequence: None,
            usage,
        }
    }

    /// All text blocks concatenated in emission order.
    pub fn text(&self) -> String {
        concat_text(&self.content)
    }

    /// Reduce the response to the parts a chat turn needs.
    pub fn to_completion(&self) -> Completion {
        Completion::new(self.text(), self.stop_reason, self.usage)
    }
}
