//! Server-Sent Events (SSE) processing for streaming responses.
//!
//! This module turns the raw byte stream of a streaming Messages response into a stream of
//! [`MessageStreamEvent`]s.  Lines are split on `\n` with an optional trailing `\r`, `event:`
//! and `data:` fields are collected until a blank line, and the collected event is decoded.
//! Bytes are buffered until a full line is available, so multi-byte characters split across
//! chunks decode correctly.

use bytes::Bytes;
use futures::stream::{self, Stream, StreamExt};
use serde_json::Value;

use crate::observability::{STREAM_BYTES, STREAM_EVENTS};
use crate::{Error, MessageStreamEvent, Result};

/// Process a stream of bytes into a stream of server-sent events.
///
/// A transport failure is reported as [`Error::StreamInterrupted`] with empty partial text;
/// the caller that knows what was already received fills that in.
pub fn process_sse<S, E>(byte_stream: S) -> impl Stream<Item = Result<MessageStreamEvent>>
where
    S: Stream<Item = std::result::Result<Bytes, E>> + Unpin + 'static,
    E: std::error::Error + Send + Sync + 'static,
{
    let state = SseState {
        stream: byte_stream,
        buffer: Vec::new(),
        builder: EventBuilder::default(),
        finished: false,
    };

    stream::unfold(state, move |mut state| async move {
        loop {
            // Drain complete lines first.
            if let Some(line) = state.next_line() {
                match line {
                    Ok(line) => {
                        if let Some(event) = state.builder.feed_line(&line) {
                            return Some((event, state));
                        }
                    }
                    Err(err) => return Some((Err(err), state)),
                }
                continue;
            }

            if state.finished {
                return None;
            }

            match state.stream.next().await {
                Some(Ok(bytes)) => {
                    STREAM_BYTES.count(bytes.len() as u64);
                    state.buffer.extend_from_slice(&bytes);
                }
                Some(Err(e)) => {
                    return Some((
                        Err(Error::stream_interrupted(
                            format!("Error in HTTP stream: {e}"),
                            String::new(),
                        )),
                        state,
                    ));
                }
                None => {
                    // End of body: flush an unterminated last line and any pending event.
                    state.finished = true;
                    if !state.buffer.is_empty() {
                        let rest = std::mem::take(&mut state.buffer);
                        match decode_line(&rest) {
                            Ok(line) => {
                                if let Some(event) = state.builder.feed_line(&line) {
                                    return Some((event, state));
                                }
                            }
                            Err(err) => return Some((Err(err), state)),
                        }
                    }
                    return state.builder.dispatch().map(|event| (event, state));
                }
            }
        }
    })
}

struct SseState<S> {
    stream: S,
    buffer: Vec<u8>,
    builder: EventBuilder,
    finished: bool,
}

impl<S> SseState<S> {
    fn next_line(&mut self) -> Option<Result<String>> {
        let newline = self.buffer.iter().position(|b| *b == b'\n')?;
        let line: Vec<u8> = self.buffer.drain(..=newline).collect();
        Some(decode_line(&line[..line.len() - 1]))
    }
}

fn decode_line(bytes: &[u8]) -> Result<String> {
    let bytes = bytes.strip_suffix(b"\r").unwrap_or(bytes);
    String::from_utf8(bytes.to_vec()).map_err(|e| {
        Error::invalid_response(format!("Invalid UTF-8 in stream: {e}"), Some(Box::new(e)))
    })
}

#[derive(Default)]
struct EventBuilder {
    name: Option<String>,
    data: Vec<String>,
}

impl EventBuilder {
    fn feed_line(&mut self, line: &str) -> Option<Result<MessageStreamEvent>> {
        if line.is_empty() {
            return self.dispatch();
        }
        if line.starts_with(':') {
            return None;
        }
        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };
        match field {
            "event" => self.name = Some(value.to_string()),
            "data" => self.data.push(value.to_string()),
            _ => {}
        }
        None
    }

    fn dispatch(&mut self) -> Option<Result<MessageStreamEvent>> {
        let name = self.name.take();
        let data = std::mem::take(&mut self.data);
        if name.is_none() && data.is_empty() {
            return None;
        }
        let event = parse_event(name.as_deref(), &data.join("\n"));
        if event.is_ok() {
            STREAM_EVENTS.click();
        }
        Some(event)
    }
}

/// Decode one event from its `event:` name and joined `data:` payload.
///
/// The event name wins over any `type` field inside the payload; a payload without a name is
/// decoded by its own `type` field.
fn parse_event(name: Option<&str>, data: &str) -> Result<MessageStreamEvent> {
    if data.trim() == "[DONE]" {
        return Ok(MessageStreamEvent::MessageStop);
    }

    if let Some(name) = name {
        if !MessageStreamEvent::EVENT_NAMES.contains(&name) {
            return Err(Error::invalid_response(
                format!("Unknown SSE event type: {name}"),
                None,
            ));
        }
    }

    let mut value = if data.trim().is_empty() {
        Value::Object(serde_json::Map::new())
    } else {
        serde_json::from_str::<Value>(data).map_err(|e| {
            Error::invalid_response(
                format!("Failed to parse event JSON: {e}"),
                Some(Box::new(e)),
            )
        })?
    };

    let Some(object) = value.as_object_mut() else {
        return Err(Error::invalid_response(
            format!("Malformed SSE event: data is not an object in '{data}'"),
            None,
        ));
    };
    match name {
        Some(name) => {
            object.insert("type".to_string(), Value::String(name.to_string()));
        }
        None if !object.contains_key("type") => {
            return Err(Error::invalid_response(
                format!("Malformed SSE event: no event name or type in '{data}'"),
                None,
            ));
        }
        None => {}
    }

    serde_json::from_value::<MessageStreamEvent>(value).map_err(|e| {
        Error::invalid_response(
            format!("Failed to parse event JSON: {e}"),
            Some(Box::new(e)),
        )
    })
}
