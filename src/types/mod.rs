// Public modules
pub mod completion;
pub mod content_block;
pub mod history;
pub mod message;
pub mod message_create_params;
pub mod message_param;
pub mod message_response;
pub mod message_stream_event;
pub mod stop_reason;
pub mod tool_param;
pub mod usage;

// Re-exports
pub use completion::{Completion, StreamFragment};
pub use content_block::{
    ContentBlock, TextBlock, ThinkingBlock, ToolResultBlock, ToolUseBlock, concat_text,
};
pub use history::MessageHistory;
pub use message::{Message, MessageRole};
pub use message_create_params::MessageCreateParams;
pub use message_param::{MessageParam, MessageParamContent, split_history};
pub use message_response::MessageResponse;
pub use message_stream_event::{
    ContentBlockDelta, ContentBlockDeltaEvent, ContentBlockStartEvent, ContentBlockStopEvent,
    MessageDelta, MessageDeltaEvent, MessageDeltaUsage, MessageStartEvent, MessageStreamEvent,
    StreamErrorDetail, StreamErrorEvent,
};
pub use stop_reason::{StopReason, StopReasonParseError};
pub use tool_param::ToolParam;
pub use usage::Usage;
