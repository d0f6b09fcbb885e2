use serde::{Deserialize, Serialize};

use crate::types::{StopReason, Usage};

/// The outcome of one finished request: the reply text, why it stopped, and what it cost.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Completion {
    /// All text segments of the reply, concatenated in emission order.
    pub text: String,

    /// Why generation ended, when the backend said.
    pub stop_reason: Option<StopReason>,

    /// Token usage reported by the backend.
    pub usage: Usage,
}

impl Completion {
    /// Create a new completion.
    pub fn new(text: impl Into<String>, stop_reason: Option<StopReason>, usage: Usage) -> Self {
        Self {
            text: text.into(),
            stop_reason,
            usage,
        }
    }
}

/// One element of a streaming completion.
///
/// A well-formed stream yields any number of `Text` fragments followed by exactly one `Done`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamFragment {
    /// An incremental piece of reply text.
    Text(String),

    /// The terminal aggregate, equivalent to a blocking completion of the same request.
    Done(Completion),
}

impl StreamFragment {
    /// The text carried by a `Text` fragment.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            StreamFragment::Text(text) => Some(text),
            StreamFragment::Done(_) => None,
        }
    }

    /// True for the terminal fragment.
    pub fn is_done(&self) -> bool {
        matches!(self, StreamFragment::Done(_))
    }
}
