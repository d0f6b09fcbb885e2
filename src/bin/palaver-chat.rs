//! Interactive chat against a local Anthropic-compatible backend.
//!
//! # Usage
//!
//! ```bash
//! # A local Ollama server with the default model
//! palaver-chat --base-url http://localhost:11434/
//!
//! # Stream replies and pick a model
//! PALAVER_BASE_URL=http://localhost:11434/ palaver-chat --stream --model qwen3-coder
//!
//! # Read settings, including base_url, from a file and log every request
//! palaver-chat --config palaver.yaml --log-file requests.jsonl
//! ```
//!
//! Type `quit` to leave and `clear` to start over; `/help` lists the few slash commands.  Ctrl+C
//! while a reply streams abandons that reply.

use std::io::IsTerminal;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use arrrg::CommandLine;

use palaver::chat::{
    ChatArgs, ChatSession, EditorInput, LineSource, ResponseMode, ScriptedInput, Settings,
};
use palaver::{Backend, JsonLinesLogger, PlainTextRenderer};

const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful coding assistant. Be concise but thorough.";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let (args, _) = ChatArgs::from_command_line_relaxed("palaver-chat [OPTIONS]");
    let mut settings = Settings::from_args(args)?;
    if settings.chat.system_prompt.is_none() {
        settings.chat.system_prompt = Some(DEFAULT_SYSTEM_PROMPT.to_string());
    }

    let mut backend = Backend::from_config(&settings.connection)?;
    if let Some(path) = &settings.log_file {
        backend = backend.with_logger(Arc::new(JsonLinesLogger::to_file(path)?));
    }

    // Flag for interrupt handling during streaming
    let interrupted = Arc::new(AtomicBool::new(false));
    let interrupted_clone = interrupted.clone();
    ctrlc::set_handler(move || {
        interrupted_clone.store(true, Ordering::Relaxed);
    })?;

    let mut input: Box<dyn LineSource> = if std::io::stdin().is_terminal() {
        Box::new(EditorInput::new()?)
    } else {
        Box::new(ScriptedInput::from_reader(std::io::stdin().lock())?)
    };
    let mut renderer =
        PlainTextRenderer::with_color(settings.chat.use_color).with_interrupt(interrupted);

    let mode = match settings.chat.mode {
        ResponseMode::Blocking => "blocking",
        ResponseMode::Streaming => "streaming",
    };
    println!(
        "Palaver chat (model: {}, {mode}, backend: {})",
        settings.chat.model,
        backend.endpoint()
    );
    println!("Type 'quit' to exit, 'clear' to start over, /help for commands\n");

    let mut session = ChatSession::new(backend, settings.chat);
    session.run(input.as_mut(), &mut renderer).await?;
    Ok(())
}
