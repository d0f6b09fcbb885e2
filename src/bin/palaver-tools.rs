//! Answer a prompt with the built-in tools available.
//!
//! The model may call `get_weather` and `calculate`; each call is run locally and its result
//! sent back until the model gives a final answer.
//!
//! ```bash
//! palaver-tools --base-url http://localhost:11434/ "What's 15 * 7 + 23?"
//! ```

use std::sync::Arc;

use arrrg::CommandLine;

use palaver::chat::{ChatArgs, Settings};
use palaver::tools::DEFAULT_MAX_TOOL_ROUNDS;
use palaver::{
    Backend, JsonLinesLogger, MessageCreateParams, MessageParam, PlainTextRenderer, Renderer,
    ToolBox, run_tool_loop,
};

const DEFAULT_PROMPT: &str = "What's the weather in Tokyo? Also, what's 15 * 7 + 23?";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let (args, free) = ChatArgs::from_command_line_relaxed("palaver-tools [OPTIONS] [PROMPT]");
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
    let params = MessageCreateParams::new(
        settings.chat.max_tokens,
        vec![MessageParam::user(prompt.as_str())],
        settings.chat.model.as_str(),
    )
    .with_optional_system(settings.chat.system_prompt.clone());

    let mut renderer = PlainTextRenderer::with_color(settings.chat.use_color);
    renderer.print_info(&format!("User: {prompt}"));
    let toolbox = ToolBox::builtin();
    match run_tool_loop(
        &backend,
        params,
        &toolbox,
        &mut renderer,
        DEFAULT_MAX_TOOL_ROUNDS,
    )
    .await
    {
        Ok(outcome) => {
            renderer.print_info("Final response:");
            renderer.print_info(&outcome.response.text());
            renderer.print_usage(&outcome.response.to_completion());
            renderer.print_info(&format!(
                "Tool rounds: {} | Total tokens: {}",
                outcome.rounds,
                outcome.usage.total_tokens()
            ));
            Ok(())
        }
        Err(err) => {
            renderer.print_error(&err.to_string());
            std::process::exit(1);
        }
    }
}
