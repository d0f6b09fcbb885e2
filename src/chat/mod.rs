//! Interactive chat sessions.
//!
//! This module provides the REPL behind `palaver-chat`, built on top of the [`ChatClient`]
//! abstraction. It supports:
//!
//! - Blocking or streaming replies, switchable at runtime
//! - Bare `quit` / `clear` words and slash commands for session control
//! - Transcript save and load
//!
//! # Architecture
//!
//! - [`config`]: CLI argument parsing and configuration
//! - [`session`]: Core chat session management
//! - [`commands`]: Input classification
//! - [`input`]: Line sources for the loop
//!
//! [`ChatClient`]: crate::ChatClient

mod commands;
mod config;
mod input;
mod session;

pub use crate::render::{PlainTextRenderer, Renderer, usage_line};
pub use commands::{InputAction, help_text, parse_input};
pub use config::{
    API_KEY_ENV, BASE_URL_ENV, ChatArgs, ChatConfig, ConnectionConfig, DEFAULT_API_KEY,
    DEFAULT_MAX_TOKENS, DEFAULT_MODEL, DEFAULT_TIMEOUT, FileConfig,
    ResponseMode, Settings,
};
pub use input::{EditorInput, LineSource, ScriptedInput};
pub use session::{ChatSession, Flow, PROMPT, SessionStats, TurnOutcome};
