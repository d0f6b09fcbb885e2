//! Send one prompt and print the reply.
//!
//! # Usage
//!
//! ```bash
//! # Blocking request against a local Ollama server
//! palaver-prompt --base-url http://localhost:11434/ "Write a Python function to reverse a string"
//!
//! # Stream the reply as it is generated
//! PALAVER_BASE_URL=http://localhost:11434/ palaver-prompt --stream "Explain recursion"
//! ```

use std::sync::Arc;

use arrrg::CommandLine;

use palaver::chat::{ChatArgs, ChatSession, ResponseMode, Settings};
use palaver::{Backend, JsonLinesLogger, PlainTextRenderer, Renderer};

const DEFAULT_PROMPT: &str = "Write a Python function to reverse a string";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let (args, free) = ChatArgs::from_command_line_relaxed("palaver-prompt [OPTIONS] [PROMPT]");
    let settings = Settings::from_args(args)?;

    let mut backend = Backend::from_config(&settings.connection)?;
    if let Some(path) = &settings.log_file {
        backend = backend.with_logger(Arc::new(JsonLinesLogger::to_file(path)?));
    }

    let prompt = if free.is_empty() {
        DEFAULT_PROMPT.to_string()
    } else {
        free.join(" ")
    };

    let use_color = settings.chat.use_color;
    let mode = settings.chat.mode;
    let mut renderer = PlainTextRenderer::with_color(use_color);
    let mut session = ChatSession::new(backend, settings.chat);

    let label = match mode {
        ResponseMode::Blocking => "blocking",
        ResponseMode::Streaming => "streaming",
    };
    renderer.print_info(&format!("Model: {} ({label})", session.model()));
    renderer.print_info(&format!("Prompt: {prompt}"));

    if let Err(err) = session.run_turn(&prompt, &mut renderer).await {
        renderer.print_error(&err.to_string());
        std::process::exit(1);
    }
    Ok(())
}
