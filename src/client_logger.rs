//! Logging hooks for backend traffic.
//!
//! [`ClientLogger`] sees every request a [`Backend`](crate::Backend) sends and everything it
//! gets back.  [`JsonLinesLogger`] is the stock implementation: one JSON object per line, each
//! stamped with an RFC 3339 time.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Mutex;

use serde::Serialize;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::{Completion, Error, MessageCreateParams, MessageResponse, Result};

/// A trait for logging backend operations.
///
/// Implementations must be cheap and must not fail the request; errors writing the log are the
/// logger's own business.
pub trait ClientLogger: Send + Sync {
    /// Log a request body just before it is sent.
    fn log_request(&self, params: &MessageCreateParams);

    /// Log a complete response from a non-streaming call.
    fn log_response(&self, response: &MessageResponse);

    /// Log one text fragment of a streaming call.
    fn log_stream_fragment(&self, text: &str) {
        _ = text;
    }

    /// Log the aggregate of a streaming call that reached its terminal event.
    fn log_stream_completion(&self, completion: &Completion);

    /// Log a failed call.
    fn log_error(&self, error: &Error);
}

#[derive(Serialize)]
struct LogRecord<'a, T: Serialize> {
    timestamp: String,
    event: &'a str,
    payload: T,
}

/// A [`ClientLogger`] that appends one JSON record per event to a writer.
///
/// Streaming fragments are not logged individually; the completion record carries the full
/// text.
pub struct JsonLinesLogger {
    writer: Mutex<Box<dyn Write + Send>>,
}

impl JsonLinesLogger {
    /// Log to an arbitrary writer.
    pub fn new(writer: impl Write + Send + 'static) -> Self {
        Self {
            writer: Mutex::new(Box::new(writer)),
        }
    }

    /// Append to the file at `path`, creating it when missing.
    pub fn to_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file: File = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path.as_ref())
            .map_err(|err| Error::io("failed to open log file", err))?;
        Ok(Self::new(BufWriter::new(file)))
    }

    fn write<T: Serialize>(&self, event: &str, payload: T) {
        let Ok(timestamp) = OffsetDateTime::now_utc().format(&Rfc3339) else {
            return;
        };
        let record = LogRecord {
            timestamp,
            event,
            payload,
        };
        let Ok(line) = serde_json::to_string(&record) else {
            return;
        };
        if let Ok(mut writer) = self.writer.lock() {
            let _ = writeln!(writer, "{line}");
            let _ = writer.flush();
        }
    }
}

#[derive(Serialize)]
struct ErrorPayload {
    message: String,
    status_code: Option<u16>,
    partial: Option<String>,
}

impl ClientLogger for JsonLinesLogger {
    fn log_request(&self, params: &MessageCreateParams) {
        self.write("request", params);
    }

    fn log_response(&self, response: &MessageResponse) {
        self.write("response", response);
    }

    fn log_stream_completion(&self, completion: &Completion) {
        self.write("stream_completion", completion);
    }

    fn log_error(&self, error: &Error) {
        self.write(
            "error",
            ErrorPayload {
                message: error.to_string(),
                status_code: error.status_code(),
                partial: error.partial_text().map(str::to_string),
            },
        );
    }
}
