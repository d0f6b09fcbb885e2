//! Conversational sessions against an Anthropic-compatible Messages backend.
//!
//! [`Backend`] speaks the Messages wire protocol, blocking or streamed over server-sent events.
//! [`chat::ChatSession`] keeps the running conversation and drives one turn per user line.

// Public modules
pub mod chat;
pub mod client;
pub mod client_logger;
pub mod error;
pub mod fragment_stream;
pub mod render;
pub mod sse;
pub mod tools;
pub mod types;

mod observability;

// Re-exports
pub use client::{Backend, BoxFragmentStream, ChatClient, build_params};
pub use client_logger::{ClientLogger, JsonLinesLogger};
pub use error::{Error, Result};
pub use fragment_stream::FragmentStream;
pub use observability::register_biometrics;
pub use render::{PlainTextRenderer, Renderer, usage_line};
pub use tools::{Tool, ToolBox, run_tool_loop};
pub use types::*;
