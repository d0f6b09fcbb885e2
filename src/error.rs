//! Error types for palaver.
//!
//! Every failure of a chat turn maps to one of four backend-facing kinds:
//! [`Error::BackendUnavailable`], [`Error::BackendError`], [`Error::InvalidResponse`], and
//! [`Error::StreamInterrupted`].  The remaining variants cover local concerns such as
//! configuration, files, and user interrupts.

use std::error;
use std::fmt;
use std::io;
use std::sync::Arc;

/// The main error type for palaver.
#[derive(Clone, Debug)]
pub enum Error {
    /// The backend could not be reached: connection refused, DNS failure, or timeout.
    BackendUnavailable {
        /// Human-readable error message.
        message: String,
        /// Underlying cause.
        source: Option<Arc<dyn error::Error + Send + Sync>>,
    },

    /// The backend answered with a failure.
    BackendError {
        /// HTTP status code.  `None` when the failure arrived as a mid-stream error event.
        status_code: Option<u16>,
        /// Error type string from the backend.
        error_type: Option<String>,
        /// Human-readable error message.
        message: String,
    },

    /// The backend answered, but the payload did not have the expected shape.
    InvalidResponse {
        /// Human-readable error message.
        message: String,
        /// The underlying error.
        source: Option<Arc<dyn error::Error + Send + Sync>>,
    },

    /// A streaming response ended before its terminal event.
    StreamInterrupted {
        /// Human-readable error message.
        message: String,
        /// Text received before the stream broke.
        partial: String,
    },

    /// The user abandoned the request.
    Abort {
        /// Human-readable error message.
        message: String,
    },

    /// Invalid configuration.
    Configuration {
        /// Human-readable error message.
        message: String,
        /// The setting at fault.
        param: Option<String>,
    },

    /// A URL parsing or manipulation error.
    Url {
        /// Human-readable error message.
        message: String,
        /// The underlying error.
        source: Option<url::ParseError>,
    },

    /// I/O error.
    Io {
        /// Human-readable error message.
        message: String,
        /// The underlying error.
        source: Arc<io::Error>,
    },
}

impl Error {
    /// Creates a new backend-unavailable error.
    pub fn backend_unavailable(
        message: impl Into<String>,
        source: Option<Box<dyn error::Error + Send + Sync>>,
    ) -> Self {
        Error::BackendUnavailable {
            message: message.into(),
            source: source.map(Arc::from),
        }
    }

    /// Creates a new backend error.
    pub fn backend(
        status_code: Option<u16>,
        error_type: Option<String>,
        message: impl Into<String>,
    ) -> Self {
        Error::BackendError {
            status_code,
            error_type,
            message: message.into(),
        }
    }

    /// Creates a new invalid-response error.
    pub fn invalid_response(
        message: impl Into<String>,
        source: Option<Box<dyn error::Error + Send + Sync>>,
    ) -> Self {
        Error::InvalidResponse {
            message: message.into(),
            source: source.map(Arc::from),
        }
    }

    /// Creates a new stream-interrupted error carrying the partial text.
    pub fn stream_interrupted(message: impl Into<String>, partial: impl Into<String>) -> Self {
        Error::StreamInterrupted {
            message: message.into(),
            partial: partial.into(),
        }
    }

    /// Creates a new abort error.
    pub fn abort(message: impl Into<String>) -> Self {
        Error::Abort {
            message: message.into(),
        }
    }

    /// Creates a new configuration error.
    pub fn configuration(message: impl Into<String>, param: Option<String>) -> Self {
        Error::Configuration {
            message: message.into(),
            param,
        }
    }

    /// Creates a new URL error.
    pub fn url(message: impl Into<String>, source: Option<url::ParseError>) -> Self {
        Error::Url {
            message: message.into(),
            source,
        }
    }

    /// Creates a new I/O error.
    pub fn io(message: impl Into<String>, source: io::Error) -> Self {
        Error::Io {
            message: message.into(),
            source: Arc::new(source),
        }
    }

    /// Returns true if the backend could not be reached.
    pub fn is_backend_unavailable(&self) -> bool {
        matches!(self, Error::BackendUnavailable { .. })
    }

    /// Returns true if the backend reported a failure.
    pub fn is_backend_error(&self) -> bool {
        matches!(self, Error::BackendError { .. })
    }

    /// Returns true if the backend payload was malformed.
    pub fn is_invalid_response(&self) -> bool {
        matches!(self, Error::InvalidResponse { .. })
    }

    /// Returns true if a stream ended early.
    pub fn is_stream_interrupted(&self) -> bool {
        matches!(self, Error::StreamInterrupted { .. })
    }

    /// Returns true if the user abandoned the request.
    pub fn is_abort(&self) -> bool {
        matches!(self, Error::Abort { .. })
    }

    /// Returns true for configuration errors.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Error::Configuration { .. })
    }

    /// Text received before a stream broke, if this is a stream interruption.
    pub fn partial_text(&self) -> Option<&str> {
        match self {
            Error::StreamInterrupted { partial, .. } => Some(partial),
            _ => None,
        }
    }

    /// Returns the status code associated with this error, if any.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Error::BackendError { status_code, .. } => *status_code,
            _ => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::BackendUnavailable { message, .. } => {
                write!(f, "Backend unavailable: {message}")
            }
            Error::BackendError {
                status_code,
                error_type,
                message,
            } => {
                write!(f, "Backend error")?;
                match (status_code, error_type) {
                    (Some(code), Some(ty)) => write!(f, " ({code} {ty})")?,
                    (Some(code), None) => write!(f, " ({code})")?,
                    (None, Some(ty)) => write!(f, " ({ty})")?,
                    (None, None) => {}
                }
                write!(f, ": {message}")
            }
            Error::InvalidResponse { message, .. } => {
                write!(f, "Invalid response: {message}")
            }
            Error::StreamInterrupted { message, partial } => {
                if partial.is_empty() {
                    write!(f, "Stream interrupted: {message}")
                } else {
                    write!(
                        f,
                        "Stream interrupted: {message} ({} characters received)",
                        partial.chars().count()
                    )
                }
            }
            Error::Abort { message } => {
                write!(f, "Request aborted: {message}")
            }
            Error::Configuration { message, param } => {
                if let Some(param) = param {
                    write!(f, "Configuration error: {message} (setting: {param})")
                } else {
                    write!(f, "Configuration error: {message}")
                }
            }
            Error::Url { message, .. } => {
                write!(f, "URL error: {message}")
            }
            Error::Io { message, .. } => {
                write!(f, "I/O error: {message}")
            }
        }
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            Error::BackendUnavailable { source, .. } => source
                .as_ref()
                .map(|e| e.as_ref() as &(dyn error::Error + 'static)),
            Error::InvalidResponse { source, .. } => source
                .as_ref()
                .map(|e| e.as_ref() as &(dyn error::Error + 'static)),
            Error::Url { source, .. } => {
                source.as_ref().map(|e| e as &(dyn error::Error + 'static))
            }
            Error::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::io(err.to_string(), err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::invalid_response(format!("JSON error: {err}"), Some(Box::new(err)))
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(err: serde_yaml::Error) -> Self {
        Error::configuration(format!("YAML error: {err}"), None)
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Error::url(format!("URL parse error: {err}"), Some(err))
    }
}

/// A specialized Result type for palaver operations.
pub type Result<T> = std::result::Result<T, Error>;
