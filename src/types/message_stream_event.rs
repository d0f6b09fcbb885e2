use serde::{Deserialize, Serialize};

use crate::types::{ContentBlock, MessageResponse, StopReason};

/// An incremental update to one content block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ContentBlockDelta {
    /// More reply text.
    #[serde(rename = "text_delta")]
    TextDelta {
        /// The text to append.
        text: String,
    },

    /// More of a tool-use input, as a fragment of JSON text.
    #[serde(rename = "input_json_delta")]
    InputJsonDelta {
        /// The JSON fragment to append.
        partial_json: String,
    },

    /// More model reasoning.
    #[serde(rename = "thinking_delta")]
    ThinkingDelta {
        /// The reasoning text to append.
        thinking: String,
    },

    /// More of a thinking signature.
    #[serde(rename = "signature_delta")]
    SignatureDelta {
        /// The signature text to append.
        signature: String,
    },

    /// A delta type this crate does not model.
    #[serde(other)]
    Unknown,
}

/// Payload of `message_start`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageStartEvent {
    /// The message skeleton, usually with empty content and input usage filled in.
    pub message: MessageResponse,
}

/// Payload of `content_block_start`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentBlockStartEvent {
    /// Position of the block in the final message.
    pub index: usize,

    /// The initial state of the block.
    pub content_block: ContentBlock,
}

/// Payload of `content_block_delta`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentBlockDeltaEvent {
    /// Position of the block being extended.
    pub index: usize,

    /// What to append.
    pub delta: ContentBlockDelta,
}

/// Payload of `content_block_stop`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentBlockStopEvent {
    /// Position of the finished block.
    pub index: usize,
}

/// Top-level changes carried by `message_delta`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MessageDelta {
    /// The reason the model stopped generating, if it has stopped.
    #[serde(default)]
    pub stop_reason: Option<StopReason>,

    /// The stop sequence that was hit, if any.
    #[serde(default)]
    pub stop_sequence: Option<String>,
}

/// Cumulative usage carried by `message_delta`.
#[derive(Debug, Copy, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MessageDeltaUsage {
    /// Input tokens, when the backend repeats them here.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_tokens: Option<u32>,

    /// Cumulative output tokens.  Absent when the backend sends no usage with the delta.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_tokens: Option<u32>,
}

/// Payload of `message_delta`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageDeltaEvent {
    /// Top-level changes.
    #[serde(default)]
    pub delta: MessageDelta,

    /// Cumulative usage so far.
    #[serde(default)]
    pub usage: MessageDeltaUsage,
}

/// Error details carried by a mid-stream `error` event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamErrorDetail {
    /// Backend error type, e.g. `overloaded_error`.
    #[serde(rename = "type", default)]
    pub error_type: Option<String>,

    /// Human-readable message.
    #[serde(default)]
    pub message: String,
}

/// Payload of `error`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamErrorEvent {
    /// What went wrong.
    pub error: StreamErrorDetail,
}

/// An event in a message stream.
///
/// Events arrive in this order: `message_start`, then for each content block a
/// `content_block_start`, any number of `content_block_delta`s and a `content_block_stop`, then
/// `message_delta` and finally `message_stop`.  `ping` may appear anywhere.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum MessageStreamEvent {
    /// Keep-alive.
    #[serde(rename = "ping")]
    Ping,

    /// Start of the message.
    #[serde(rename = "message_start")]
    MessageStart(MessageStartEvent),

    /// Start of a content block.
    #[serde(rename = "content_block_start")]
    ContentBlockStart(ContentBlockStartEvent),

    /// Incremental content.
    #[serde(rename = "content_block_delta")]
    ContentBlockDelta(ContentBlockDeltaEvent),

    /// End of a content block.
    #[serde(rename = "content_block_stop")]
    ContentBlockStop(ContentBlockStopEvent),

    /// Stop reason and final usage.
    #[serde(rename = "message_delta")]
    MessageDelta(MessageDeltaEvent),

    /// End of the message.  Always the last event of a successful stream.
    #[serde(rename = "message_stop")]
    MessageStop,

    /// The backend failed mid-stream.
    #[serde(rename = "error")]
    Error(StreamErrorEvent),
}

impl MessageStreamEvent {
    /// The SSE event names this enum understands.
    pub const EVENT_NAMES: &'static [&'static str] = &[
        "ping",
        "message_start",
        "content_block_start",
        "content_block_delta",
        "content_block_stop",
        "message_delta",
        "message_stop",
        "error",
    ];

    /// The text carried by a text delta, if this is one.
    pub fn text_delta(&self) -> Option<&str> {
        match self {
            MessageStreamEvent::ContentBlockDelta(ContentBlockDeltaEvent {
                delta: ContentBlockDelta::TextDelta { text },
                ..
            }) => Some(text),
            _ => None,
        }
    }
}
