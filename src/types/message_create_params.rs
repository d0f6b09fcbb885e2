use serde::{Deserialize, Serialize};

use crate::types::{MessageParam, ToolParam};

/// The body of a `POST /v1/messages` request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MessageCreateParams {
    /// Identifier of the model the backend should run.
    pub model: String,

    /// Upper bound on generated tokens.  Backends may truncate or reject, so treat it as a hint.
    pub max_tokens: u32,

    /// Conversation turns in order.
    pub messages: Vec<MessageParam>,

    /// Instruction text that steers the assistant.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,

    /// Client-side tools the model may call.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<ToolParam>>,

    /// Whether the response is delivered as server-sent events.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub stream: bool,
}

impl MessageCreateParams {
    /// Create a new non-streaming request.
    pub fn new(max_tokens: u32, messages: Vec<MessageParam>, model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            max_tokens,
            messages,
            system: None,
            tools: None,
            stream: false,
        }
    }

    /// Set the system prompt.
    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    /// Set the system prompt from an optional value.
    pub fn with_optional_system(mut self, system: Option<String>) -> Self {
        self.system = system;
        self
    }

    /// Offer tools to the model.
    pub fn with_tools(mut self, tools: Vec<ToolParam>) -> Self {
        self.tools = if tools.is_empty() { None } else { Some(tools) };
        self
    }

    /// Enable or disable streaming.
    pub fn with_stream(mut self, stream: bool) -> Self {
        self.stream = stream;
        self
    }
}
