use std::pin::Pin;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use futures::Stream;
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::{Client as ReqwestClient, Response};
use serde::Deserialize;
use url::Url;

use crate::chat::{ChatConfig, ConnectionConfig};
use crate::client_logger::ClientLogger;
use crate::error::{Error, Result};
use crate::fragment_stream::FragmentStream;
use crate::observability::{CLIENT_REQUEST_DURATION, CLIENT_REQUEST_ERRORS, CLIENT_REQUESTS};
use crate::sse::process_sse;
use crate::types::{
    Completion, Message, MessageCreateParams, MessageResponse, StreamFragment, split_history,
};

const API_VERSION: &str = "2023-06-01";
const MESSAGES_PATH: &str = "v1/messages";

/// A boxed stream of reply fragments, as returned by [`ChatClient::complete_streaming`].
pub type BoxFragmentStream = Pin<Box<dyn Stream<Item = Result<StreamFragment>> + Send>>;

/// Something that can turn a conversation into a reply.
///
/// Both paths issue exactly one request and never retry.  The final [`StreamFragment::Done`]
/// of a streaming reply carries what [`complete`](ChatClient::complete) would have returned
/// for the same request.
#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Request a complete reply.
    async fn complete(&self, history: &[Message], config: &ChatConfig) -> Result<Completion>;

    /// Request a reply as a lazy stream of fragments.
    ///
    /// The response body is read only as the stream is polled; dropping the stream releases
    /// the connection.
    async fn complete_streaming(
        &self,
        history: &[Message],
        config: &ChatConfig,
    ) -> Result<BoxFragmentStream>;
}

/// Build the request body for a history.
///
/// System turns are lifted into the `system` field after the configured system prompt.
pub fn build_params(history: &[Message], config: &ChatConfig) -> MessageCreateParams {
    let (messages, history_system) = split_history(history);
    let system = match (config.system_prompt.clone(), history_system) {
        (Some(prompt), Some(extra)) => Some(format!("{prompt}\n\n{extra}")),
        (prompt, extra) => prompt.or(extra),
    };
    MessageCreateParams::new(config.max_tokens, messages, config.model.clone())
        .with_optional_system(system)
}

/// Client for a backend that speaks the Messages protocol.
#[derive(Clone)]
pub struct Backend {
    api_key: String,
    client: ReqwestClient,
    endpoint: Url,
    timeout: Duration,
    logger: Option<Arc<dyn ClientLogger>>,
}

impl Backend {
    /// Create a backend from resolved connection settings.
    pub fn from_config(config: &ConnectionConfig) -> Result<Self> {
        Self::with_options(config.api_key.clone(), &config.base_url, config.timeout)
    }

    /// Create a new client with custom settings.
    ///
    /// `base_url` must be an absolute http or https URL; requests go to
    /// `{base_url}v1/messages`.
    pub fn with_options(
        api_key: impl Into<String>,
        base_url: &str,
        timeout: Duration,
    ) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.is_empty() {
            return Err(Error::configuration(
                "API key must not be empty",
                Some("api_key".to_string()),
            ));
        }
        let endpoint = messages_endpoint(base_url)?;
        let client = ReqwestClient::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                Error::configuration(format!("Failed to build HTTP client: {e}"), None)
            })?;
        Ok(Self {
            api_key,
            client,
            endpoint,
            timeout,
            logger: None,
        })
    }

    /// Attach a logger that sees every request and response.
    pub fn with_logger(mut self, logger: Arc<dyn ClientLogger>) -> Self {
        self.logger = Some(logger);
        self
    }

    /// The URL requests are posted to.
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    fn default_headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));
        let key = HeaderValue::from_str(&self.api_key).map_err(|_| {
            Error::configuration(
                "API key contains characters not allowed in a header",
                Some("api_key".to_string()),
            )
        })?;
        headers.insert("x-api-key", key);
        headers.insert("anthropic-version", HeaderValue::from_static(API_VERSION));
        Ok(headers)
    }

    /// Convert a non-success response into a backend error.
    async fn process_error_response(response: Response) -> Error {
        #[derive(Deserialize)]
        struct ErrorResponse {
            error: Option<ErrorDetail>,
        }

        #[derive(Deserialize)]
        struct ErrorDetail {
            #[serde(rename = "type")]
            error_type: Option<String>,
            message: Option<String>,
        }

        let status = response.status();
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                return Error::backend(
                    Some(status.as_u16()),
                    None,
                    format!("{status} (failed to read error body: {e})"),
                );
            }
        };

        let detail = serde_json::from_str::<ErrorResponse>(&body)
            .ok()
            .and_then(|parsed| parsed.error);
        let error_type = detail.as_ref().and_then(|d| d.error_type.clone());
        let message = detail
            .and_then(|d| d.message)
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| {
                if body.trim().is_empty() {
                    status.to_string()
                } else {
                    body.trim().to_string()
                }
            });
        Error::backend(Some(status.as_u16()), error_type, message)
    }

    fn transport_error(&self, e: reqwest::Error) -> Error {
        if e.is_timeout() {
            Error::backend_unavailable(
                format!("Request timed out after {}s: {e}", self.timeout.as_secs_f64()),
                Some(Box::new(e)),
            )
        } else if e.is_connect() {
            Error::backend_unavailable(format!("Connection error: {e}"), Some(Box::new(e)))
        } else {
            Error::backend_unavailable(format!("Request failed: {e}"), Some(Box::new(e)))
        }
    }

    async fn post(&self, params: &MessageCreateParams, accept: &'static str) -> Result<Response> {
        if let Some(logger) = &self.logger {
            logger.log_request(params);
        }
        CLIENT_REQUESTS.click();
        let mut headers = self.default_headers()?;
        headers.insert(header::ACCEPT, HeaderValue::from_static(accept));

        let response = self
            .client
            .post(self.endpoint.clone())
            .headers(headers)
            .json(params)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        if !response.status().is_success() {
            return Err(Self::process_error_response(response).await);
        }
        Ok(response)
    }

    fn record_error(&self, err: &Error) {
        CLIENT_REQUEST_ERRORS.click();
        if let Some(logger) = &self.logger {
            logger.log_error(err);
        }
    }

    /// Send a request and wait for the complete response.
    pub async fn send(&self, mut params: MessageCreateParams) -> Result<MessageResponse> {
        params.stream = false;
        let start = Instant::now();
        let result = self.send_inner(&params).await;
        CLIENT_REQUEST_DURATION.add(start.elapsed().as_secs_f64());
        match result {
            Ok(response) => {
                if let Some(logger) = &self.logger {
                    logger.log_response(&response);
                }
                Ok(response)
            }
            Err(err) => {
                self.record_error(&err);
                Err(err)
            }
        }
    }

    async fn send_inner(&self, params: &MessageCreateParams) -> Result<MessageResponse> {
        let response = self.post(params, "application/json").await?;
        let body = response
            .bytes()
            .await
            .map_err(|e| self.transport_error(e))?;
        serde_json::from_slice::<MessageResponse>(&body).map_err(|e| {
            Error::invalid_response(
                format!("Failed to parse response: {e}"),
                Some(Box::new(e)),
            )
        })
    }

    /// Send a request and get the reply as a stream of fragments.
    ///
    /// Fails early with the status-level errors; everything after the headers surfaces through
    /// the stream.
    pub async fn stream(&self, mut params: MessageCreateParams) -> Result<FragmentStream> {
        params.stream = true;
        let start = Instant::now();
        let result = self.post(&params, "text/event-stream").await;
        CLIENT_REQUEST_DURATION.add(start.elapsed().as_secs_f64());
        let response = match result {
            Ok(response) => response,
            Err(err) => {
                self.record_error(&err);
                return Err(err);
            }
        };
        let events = process_sse(response.bytes_stream());
        Ok(FragmentStream::new(events).with_logger(self.logger.clone()))
    }
}

impl std::fmt::Debug for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Backend")
            .field("endpoint", &self.endpoint.as_str())
            .field("timeout", &self.timeout)
            .field("logger", &self.logger.is_some())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl ChatClient for Backend {
    async fn complete(&self, history: &[Message], config: &ChatConfig) -> Result<Completion> {
        let response = self.send(build_params(history, config)).await?;
        Ok(response.to_completion())
    }

    async fn complete_streaming(
        &self,
        history: &[Message],
        config: &ChatConfig,
    ) -> Result<BoxFragmentStream> {
        let stream = self.stream(build_params(history, config)).await?;
        Ok(Box::pin(stream))
    }
}

fn messages_endpoint(base_url: &str) -> Result<Url> {
    let mut base = Url::parse(base_url)
        .map_err(|e| Error::url(format!("invalid base URL {base_url:?}: {e}"), Some(e)))?;
    if base.scheme() != "http" && base.scheme() != "https" {
        return Err(Error::configuration(
            format!("base URL must be http or https, not {}", base.scheme()),
            Some("base_url".to_string()),
        ));
    }
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    Ok(base.join(MESSAGES_PATH)?)
}
