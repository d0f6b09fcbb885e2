//! Configuration types for palaver sessions.
//!
//! Settings come from three places.  Command-line flags (parsed with `arrrg`) win over an
//! optional YAML file, the file wins over the `PALAVER_*` environment variables, and those win
//! over the built-in defaults, which suit a local Ollama server.  The base URL has no default:
//! one of the three sources must name the backend.

use std::path::{Path, PathBuf};
use std::time::Duration;

use arrrg_derive::CommandLine;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Ollama accepts any key; this is the conventional one.
pub const DEFAULT_API_KEY: &str = "ollama";
/// Default model identifier.
pub const DEFAULT_MODEL: &str = "qwen3-coder";
/// Default maximum tokens per response.
pub const DEFAULT_MAX_TOKENS: u32 = 1024;
/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Environment variable consulted for the API key.
pub const API_KEY_ENV: &str = "PALAVER_API_KEY";
/// Environment variable consulted for the base URL.
pub const BASE_URL_ENV: &str = "PALAVER_BASE_URL";

/// Command-line arguments shared by the palaver binaries.
#[derive(CommandLine, Debug, Default, PartialEq, Eq)]
pub struct ChatArgs {
    /// Base URL of the backend.
    #[arrrg(optional, "Backend base URL, e.g. http://localhost:11434/ (required)", "URL")]
    pub base_url: Option<String>,

    /// Credential sent as `x-api-key`.
    #[arrrg(optional, "API key sent to the backend (default: ollama)", "KEY")]
    pub api_key: Option<String>,

    /// Model to use.
    #[arrrg(optional, "Model to use (default: qwen3-coder)", "MODEL")]
    pub model: Option<String>,

    /// System prompt to set context for the conversation.
    #[arrrg(optional, "System prompt for the conversation", "PROMPT")]
    pub system: Option<String>,

    /// Maximum tokens per response.
    #[arrrg(optional, "Max tokens per response (default: 1024)", "TOKENS")]
    pub max_tokens: Option<u32>,

    /// Request timeout in seconds.
    #[arrrg(optional, "Request timeout in seconds (default: 60)", "SECONDS")]
    pub timeout_secs: Option<u64>,

    /// Stream replies as they are generated.
    #[arrrg(flag, "Stream replies as they are generated")]
    pub stream: bool,

    /// Disable ANSI colors and styles.
    #[arrrg(flag, "Disable ANSI colors/styles")]
    pub no_color: bool,

    /// YAML file with default settings.
    #[arrrg(optional, "YAML file with default settings", "PATH")]
    pub config: Option<String>,

    /// File to append JSON-lines request logs to.
    #[arrrg(optional, "Append JSON-lines request logs to PATH", "PATH")]
    pub log_file: Option<String>,
}

/// The settings a YAML configuration file may carry.  Every key is optional.
///
/// ```yaml
/// base_url: http://localhost:11434/
/// model: qwen3-coder
/// system: You are a helpful coding assistant. Be concise but thorough.
/// max_tokens: 1024
/// stream: true
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    /// Base URL of the backend.
    #[serde(default)]
    pub base_url: Option<String>,
    /// Credential sent as `x-api-key`.
    #[serde(default)]
    pub api_key: Option<String>,
    /// Model identifier.
    #[serde(default)]
    pub model: Option<String>,
    /// System prompt.
    #[serde(default)]
    pub system: Option<String>,
    /// Maximum tokens per response.
    #[serde(default)]
    pub max_tokens: Option<u32>,
    /// Request timeout in seconds.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    /// Stream replies.
    #[serde(default)]
    pub stream: Option<bool>,
    /// Use ANSI colors.
    #[serde(default)]
    pub color: Option<bool>,
    /// Request log file.
    #[serde(default)]
    pub log_file: Option<PathBuf>,
}

impl FileConfig {
    /// Parse a configuration file from YAML text.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Load a configuration file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path).map_err(|err| {
            Error::io(format!("failed to read config {}", path.display()), err)
        })?;
        Self::from_yaml(&yaml)
    }
}

/// How a session asks for replies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ResponseMode {
    /// One request, one complete reply.
    #[default]
    Blocking,
    /// Reply text is displayed as it arrives.
    Streaming,
}

/// Where and how to reach the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    /// Base URL; requests go to `{base_url}v1/messages`.
    pub base_url: String,
    /// Opaque credential.
    pub api_key: String,
    /// Bound on each request, including connection setup.
    pub timeout: Duration,
}

impl ConnectionConfig {
    /// Connect to `base_url` with the default key and timeout.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: DEFAULT_API_KEY.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// Per-request configuration for a chat session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatConfig {
    /// The model to use for generating responses.
    pub model: String,

    /// Optional system prompt.  Sent with every request; never stored in the history.
    pub system_prompt: Option<String>,

    /// Maximum tokens per response.  A hint the backend may ignore.
    pub max_tokens: u32,

    /// Blocking or streaming replies.
    pub mode: ResponseMode,

    /// Whether to use ANSI colors and styles in output.
    pub use_color: bool,
}

impl ChatConfig {
    /// Creates a new ChatConfig with default values.
    ///
    /// Defaults:
    /// - Model: qwen3-coder
    /// - Max tokens: 1024
    /// - Mode: blocking
    /// - Color: enabled
    pub fn new() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            system_prompt: None,
            max_tokens: DEFAULT_MAX_TOKENS,
            mode: ResponseMode::Blocking,
            use_color: true,
        }
    }

    /// Sets the model to use.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Sets the system prompt.
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    /// Sets the maximum tokens per response.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Sets the response mode.
    pub fn with_mode(mut self, mode: ResponseMode) -> Self {
        self.mode = mode;
        self
    }

    /// Disables ANSI color output.
    pub fn without_color(mut self) -> Self {
        self.use_color = false;
        self
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Fully resolved settings for a binary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Backend connection.
    pub connection: ConnectionConfig,
    /// Session configuration.
    pub chat: ChatConfig,
    /// Where to write request logs, if anywhere.
    pub log_file: Option<PathBuf>,
}

impl Settings {
    /// Resolve settings from parsed arguments, the config file they name, and the process
    /// environment.
    pub fn from_args(args: ChatArgs) -> Result<Self> {
        let file = match args.config.as_deref() {
            Some(path) => FileConfig::load(path)?,
            None => FileConfig::default(),
        };
        Self::merge(args, file, |name| std::env::var(name).ok())
    }

    /// Merge the three sources.  `env` looks up environment variables.
    pub fn merge(
        args: ChatArgs,
        file: FileConfig,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let base_url = args
            .base_url
            .or(file.base_url)
            .or_else(|| env(BASE_URL_ENV))
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| {
                Error::configuration(
                    format!(
                        "no backend base URL given; use --base-url, base_url in the config file, or {BASE_URL_ENV}"
                    ),
                    Some("base_url".to_string()),
                )
            })?;
        let api_key = args
            .api_key
            .or(file.api_key)
            .or_else(|| env(API_KEY_ENV))
            .unwrap_or_else(|| DEFAULT_API_KEY.to_string());
        let timeout_secs = args
            .timeout_secs
            .or(file.timeout_secs)
            .unwrap_or(DEFAULT_TIMEOUT.as_secs());
        let model = args
            .model
            .or(file.model)
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());
        let max_tokens = args
            .max_tokens
            .or(file.max_tokens)
            .unwrap_or(DEFAULT_MAX_TOKENS);
        let stream = args.stream || file.stream.unwrap_or(false);
        let use_color = !args.no_color && file.color.unwrap_or(true);

        if api_key.is_empty() {
            return Err(Error::configuration(
                "API key must not be empty",
                Some("api_key".to_string()),
            ));
        }
        if model.trim().is_empty() {
            return Err(Error::configuration(
                "model must not be empty",
                Some("model".to_string()),
            ));
        }
        if max_tokens == 0 {
            return Err(Error::configuration(
                "max_tokens must be positive",
                Some("max_tokens".to_string()),
            ));
        }
        if timeout_secs == 0 {
            return Err(Error::configuration(
                "timeout must be positive",
                Some("timeout_secs".to_string()),
            ));
        }

        let chat = ChatConfig {
            model,
            system_prompt: args.system.or(file.system),
            max_tokens,
            mode: if stream {
                ResponseMode::Streaming
            } else {
                ResponseMode::Blocking
            },
            use_color,
        };
        Ok(Settings {
            connection: ConnectionConfig {
                base_url,
                api_key,
                timeout: Duration::from_secs(timeout_secs),
            },
            chat,
            log_file: args.log_file.map(PathBuf::from).or(file.log_file),
        })
    }
}
