//! Output rendering for palaver sessions.
//!
//! The session never writes to the console itself; it drives a [`Renderer`].
//! [`PlainTextRenderer`] writes plain text with optional ANSI styling to any writer, stdout by
//! default.

use std::io::{self, Stdout, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde_json::Value;

use crate::Completion;

/// ANSI escape code for bold text (used for the reply header).
const ANSI_BOLD: &str = "\x1b[1m";

/// ANSI escape code for dim text (used for usage lines).
const ANSI_DIM: &str = "\x1b[2m";

/// ANSI escape code to reset all styling.
const ANSI_RESET: &str = "\x1b[0m";

/// ANSI escape code for cyan text (used for tool names).
const ANSI_CYAN: &str = "\x1b[36m";

/// ANSI escape code for green text (used for tool result success).
const ANSI_GREEN: &str = "\x1b[32m";

/// ANSI escape code for red text (used for errors).
const ANSI_RED: &str = "\x1b[31m";

/// Format the usage line printed after each reply.
///
/// ```
/// # use palaver::{Completion, StopReason, Usage, usage_line};
/// let completion = Completion::new("", Some(StopReason::EndTurn), Usage::new(12, 40));
/// assert_eq!(
///     usage_line(&completion),
///     "Stop reason: end_turn | Input tokens: 12 | Output tokens: 40 | Total tokens: 52"
/// );
/// ```
pub fn usage_line(completion: &Completion) -> String {
    let stop_reason = completion
        .stop_reason
        .map(|reason| reason.as_str())
        .unwrap_or("unknown");
    format!(
        "Stop reason: {stop_reason} | Input tokens: {} | Output tokens: {} | Total tokens: {}",
        completion.usage.input_tokens,
        completion.usage.output_tokens,
        completion.usage.total_tokens()
    )
}

/// Trait for rendering session output.
///
/// This abstraction allows for different rendering strategies:
/// plain text with or without ANSI styling, or capture for tests.
pub trait Renderer: Send {
    /// Called before the first fragment of a reply.
    fn start_response(&mut self);

    /// Print a chunk of reply text.
    ///
    /// This is called incrementally as fragments arrive, or once for a blocking reply.
    fn print_text(&mut self, text: &str);

    /// Called when a reply is complete.
    fn finish_response(&mut self);

    /// Print the usage line for a finished reply.
    fn print_usage(&mut self, completion: &Completion);

    /// Print an error message.
    fn print_error(&mut self, error: &str);

    /// Print an informational message.
    fn print_info(&mut self, info: &str);

    /// Called when the model asks for a tool.
    fn print_tool_call(&mut self, name: &str, input: &Value) {
        _ = name;
        _ = input;
    }

    /// Called with the outcome of a tool call.
    fn print_tool_result(&mut self, name: &str, result: &str, is_error: bool) {
        _ = name;
        _ = result;
        _ = is_error;
    }

    /// Called when a reply is abandoned at the user's request.
    fn print_interrupted(&mut self) {}

    /// Returns true if streaming should be interrupted.
    fn should_interrupt(&self) -> bool {
        false
    }

    /// Forget any interrupt requested so far.
    fn reset_interrupt(&mut self) {}
}

/// Plain text renderer with optional ANSI styling.
pub struct PlainTextRenderer<W: Write + Send = Stdout> {
    out: W,
    use_color: bool,
    line_start: bool,
    interrupted: Option<Arc<AtomicBool>>,
}

impl PlainTextRenderer<Stdout> {
    /// Creates a new PlainTextRenderer on stdout with ANSI colors enabled.
    pub fn new() -> Self {
        Self::with_color(true)
    }

    /// Creates a new PlainTextRenderer on stdout with specified color setting.
    pub fn with_color(use_color: bool) -> Self {
        Self::with_writer(io::stdout(), use_color)
    }
}

impl<W: Write + Send> PlainTextRenderer<W> {
    /// Creates a renderer that writes to `out`.
    pub fn with_writer(out: W, use_color: bool) -> Self {
        Self {
            out,
            use_color,
            line_start: true,
            interrupted: None,
        }
    }

    /// Attaches an interrupt flag to the renderer.
    pub fn with_interrupt(mut self, interrupted: Arc<AtomicBool>) -> Self {
        self.interrupted = Some(interrupted);
        self
    }

    /// The underlying writer.
    pub fn writer(&self) -> &W {
        &self.out
    }

    /// Unwraps the underlying writer.
    pub fn into_inner(self) -> W {
        self.out
    }

    fn write(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        let _ = self.out.write_all(text.as_bytes());
        let _ = self.out.flush();
        self.line_start = text.ends_with('\n');
    }

    fn write_line(&mut self, style: &str, text: &str) {
        if !self.line_start {
            self.write("\n");
        }
        if self.use_color && !style.is_empty() {
            self.write(&format!("{style}{text}{ANSI_RESET}\n"));
        } else {
            self.write(&format!("{text}\n"));
        }
    }
}

impl Default for PlainTextRenderer<Stdout> {
    fn default() -> Self {
        Self::new()
    }
}

impl<W: Write + Send> Renderer for PlainTextRenderer<W> {
    fn start_response(&mut self) {
        if !self.line_start {
            self.write("\n");
        }
        if self.use_color {
            self.write(&format!("{ANSI_BOLD}Assistant:{ANSI_RESET} "));
        } else {
            self.write("Assistant: ");
        }
    }

    fn print_text(&mut self, text: &str) {
        self.write(text);
    }

    fn finish_response(&mut self) {
        if !self.line_start {
            self.write("\n");
        }
    }

    fn print_usage(&mut self, completion: &Completion) {
        self.write_line(ANSI_DIM, &usage_line(completion));
    }

    fn print_error(&mut self, error: &str) {
        self.write_line(ANSI_RED, &format!("Error: {error}"));
    }

    fn print_info(&mut self, info: &str) {
        self.write_line("", info);
    }

    fn print_tool_call(&mut self, name: &str, input: &Value) {
        let text = format!("[tool: {name}] {input}");
        self.write_line(ANSI_CYAN, &text);
    }

    fn print_tool_result(&mut self, name: &str, result: &str, is_error: bool) {
        let (style, status) = if is_error {
            (ANSI_RED, "error")
        } else {
            (ANSI_GREEN, "ok")
        };
        self.write_line(style, &format!("[tool result: {name} ({status})] {result}"));
    }

    fn print_interrupted(&mut self) {
        self.write_line("", "[interrupted]");
    }

    fn should_interrupt(&self) -> bool {
        self.interrupted
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
    }

    fn reset_interrupt(&mut self) {
        if let Some(flag) = &self.interrupted {
            flag.store(false, Ordering::Relaxed);
        }
    }
}
