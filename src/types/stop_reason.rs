use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Why the backend stopped generating.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// The model reached a natural end of its turn.
    EndTurn,

    /// Generation hit the `max_tokens` limit of the request.
    MaxTokens,

    /// The model emitted a configured stop sequence.
    StopSequence,

    /// The model wants the caller to run a tool.
    ToolUse,

    /// The backend paused a long-running turn.
    PauseTurn,

    /// The model declined to answer.
    Refusal,
}

impl StopReason {
    /// The wire spelling of this stop reason.
    pub fn as_str(&self) -> &'static str {
        match self {
            StopReason::EndTurn => "end_turn",
            StopReason::MaxTokens => "max_tokens",
            StopReason::StopSequence => "stop_sequence",
            StopReason::ToolUse => "tool_use",
            StopReason::PauseTurn => "pause_turn",
            StopReason::Refusal => "refusal",
        }
    }
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an invalid stop reason string.
#[derive(Debug)]
pub struct StopReasonParseError {
    /// The string that could not be parsed.
    pub invalid_value: String,
}

impl fmt::Display for StopReasonParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Unknown stop reason: {}", self.invalid_value)
    }
}

impl std::error::Error for StopReasonParseError {}

impl FromStr for StopReason {
    type Err = StopReasonParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "end_turn" => Ok(StopReason::EndTurn),
            "max_tokens" => Ok(StopReason::MaxTokens),
            "stop_sequence" => Ok(StopReason::StopSequence),
            "tool_use" => Ok(StopReason::ToolUse),
            "pause_turn" => Ok(StopReason::PauseTurn),
            "refusal" => Ok(StopReason::Refusal),
            _ => Err(StopReasonParseError {
                invalid_value: s.to_string(),
            }),
        }
    }
}
