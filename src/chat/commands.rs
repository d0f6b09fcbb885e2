//! Classification of raw input lines.
//!
//! Every line typed at the prompt becomes an [`InputAction`].  The bare words `quit` and
//! `clear` are recognized case-insensitively so the chat behaves like the classic
//! line-oriented demos.  A handful of `/` commands report on the session or persist it; a
//! line that merely starts with `/` is still a message.

/// What a line of input asks the session to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputAction {
    /// Nothing was typed; prompt again.
    Empty,

    /// End the session.
    Quit,

    /// Clear the conversation history and keep going.
    Reset,

    /// Display help information.
    Help,

    /// Display session statistics.
    Stats,

    /// Save the transcript to a file.
    SaveTranscript(String),

    /// Load conversation history from a file.
    LoadTranscript(String),

    /// A known command used wrongly; the payload says why.
    Invalid(String),

    /// Text to send to the model.
    Message(String),
}

/// Classify one raw input line.
///
/// # Examples
///
/// ```
/// # use palaver::chat::{InputAction, parse_input};
/// assert_eq!(parse_input("  "), InputAction::Empty);
/// assert_eq!(parse_input("QUIT"), InputAction::Quit);
/// assert_eq!(parse_input("clear"), InputAction::Reset);
/// assert_eq!(
///     parse_input("Write a palindrome checker"),
///     InputAction::Message("Write a palindrome checker".to_string())
/// );
/// ```
pub fn parse_input(raw: &str) -> InputAction {
    let input = raw.trim();
    if input.is_empty() {
        return InputAction::Empty;
    }
    if input.eq_ignore_ascii_case("quit") {
        return InputAction::Quit;
    }
    if input.eq_ignore_ascii_case("clear") {
        return InputAction::Reset;
    }
    input
        .strip_prefix('/')
        .and_then(parse_command)
        .unwrap_or_else(|| InputAction::Message(input.to_string()))
}

// `None` means the line is not a command at all.
fn parse_command(input: &str) -> Option<InputAction> {
    let mut parts = input.splitn(2, char::is_whitespace);
    let command = parts.next().unwrap_or_default().to_lowercase();
    let argument = parts.next().map(str::trim).filter(|s| !s.is_empty());

    let action = match command.as_str() {
        "quit" | "exit" => InputAction::Quit,
        "clear" => InputAction::Reset,
        "help" => InputAction::Help,
        "stats" => InputAction::Stats,
        "save" => match argument {
            Some(path) => InputAction::SaveTranscript(path.to_string()),
            None => InputAction::Invalid("/save requires a file path".to_string()),
        },
        "load" => match argument {
            Some(path) => InputAction::LoadTranscript(path.to_string()),
            None => InputAction::Invalid("/load requires a file path".to_string()),
        },
        _ => return None,
    };
    Some(action)
}

/// Returns help text describing available commands.
pub fn help_text() -> &'static str {
    r#"Available commands:
  quit, /quit            Exit the chat
  clear, /clear          Clear conversation history
  /save <file>           Save the current transcript
  /load <file>           Load a transcript from disk
  /stats                 Show session statistics
  /help                  Show this help message"#
}
