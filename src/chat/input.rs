//! Line-oriented input for the session loop.

use std::collections::VecDeque;
use std::io::{self, BufRead};

use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;

use crate::{Error, Result};

/// A source of input lines.
pub trait LineSource {
    /// Show `prompt` and read one line.  `Ok(None)` means the input is exhausted.
    fn read_line(&mut self, prompt: &str) -> Result<Option<String>>;
}

/// Interactive input backed by a rustyline editor.
///
/// Ctrl+C at the prompt yields an empty line; Ctrl+D ends the input.
pub struct EditorInput {
    editor: DefaultEditor,
}

impl EditorInput {
    /// Creates an editor on the controlling terminal.
    pub fn new() -> Result<Self> {
        let editor = DefaultEditor::new().map_err(readline_error)?;
        Ok(Self { editor })
    }
}

impl LineSource for EditorInput {
    fn read_line(&mut self, prompt: &str) -> Result<Option<String>> {
        match self.editor.readline(prompt) {
            Ok(line) => {
                if !line.trim().is_empty() {
                    let _ = self.editor.add_history_entry(line.as_str());
                }
                Ok(Some(line))
            }
            Err(ReadlineError::Interrupted) => {
                println!();
                Ok(Some(String::new()))
            }
            Err(ReadlineError::Eof) => Ok(None),
            Err(err) => Err(readline_error(err)),
        }
    }
}

fn readline_error(err: ReadlineError) -> Error {
    match err {
        ReadlineError::Io(err) => Error::io("failed to read input", err),
        err => Error::io("failed to read input", io::Error::other(err.to_string())),
    }
}

/// A fixed list of lines, for piped input and tests.
#[derive(Debug, Clone, Default)]
pub struct ScriptedInput {
    lines: VecDeque<String>,
}

impl ScriptedInput {
    /// Creates a source that yields `lines` in order.
    pub fn new<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            lines: lines.into_iter().map(Into::into).collect(),
        }
    }

    /// Reads every line of `reader` up front.
    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self> {
        let lines = reader
            .lines()
            .collect::<io::Result<Vec<_>>>()
            .map_err(|err| Error::io("failed to read input", err))?;
        Ok(Self::new(lines))
    }

    /// Lines not yet consumed.
    pub fn remaining(&self) -> usize {
        self.lines.len()
    }
}

impl LineSource for ScriptedInput {
    fn read_line(&mut self, _prompt: &str) -> Result<Option<String>> {
        Ok(self.lines.pop_front())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scripted_lines_in_order() {
        let mut input = ScriptedInput::new(["hello", "quit"]);
        assert_eq!(input.read_line("You: ").unwrap().as_deref(), Some("hello"));
        assert_eq!(input.remaining(), 1);
        assert_eq!(input.read_line("You: ").unwrap().as_deref(), Some("quit"));
        assert_eq!(input.read_line("You: ").unwrap(), None);
    }

    #[test]
    fn scripted_from_reader() {
        let mut input = ScriptedInput::from_reader("one\ntwo\r\n".as_bytes()).unwrap();
        assert_eq!(input.read_line("").unwrap().as_deref(), Some("one"));
        assert_eq!(input.read_line("").unwrap().as_deref(), Some("two"));
        assert_eq!(input.read_line("").unwrap(), None);
    }
}
