//! Model transport abstraction.
//!
//! The [`ModelTransport`] trait decouples the agent loop from the HTTP backend
//! (currently the Anthropic Messages API). Tests use scripted transports that
//! return queued responses without touching the network.

use std::time::Duration;

use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::core::messages::{ModelRequest, ModelResponse};
use crate::io::config::AgentConfig;

pub const ANTHROPIC_VERSION: &str = "2023-06-01";
const HDR_ANTHROPIC_VERSION: &str = "anthropic-version";
const HDR_X_API_KEY: &str = "x-api-key";

/// A model call that did not produce a usable response.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("model API returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("model request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("invalid model response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("{0}")]
    Other(String),
}

/// Abstraction over model backends. One call per loop iteration, no retries.
pub trait ModelTransport {
    fn send(&self, request: &ModelRequest) -> Result<ModelResponse, TransportError>;
}

/// Blocking HTTP transport for the Anthropic Messages API.
#[derive(Debug, Clone)]
pub struct AnthropicTransport {
    client: reqwest::blocking::Client,
    endpoint: String,
    api_key: String,
}

impl AnthropicTransport {
    pub fn new(config: &AgentConfig, api_key: impl Into<String>) -> Result<Self, TransportError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;
        Ok(Self {
            client,
            endpoint: format!("{}/v1/messages", config.api_base.trim_end_matches('/')),
            api_key: api_key.into(),
        })
    }
}

impl ModelTransport for AnthropicTransport {
    #[instrument(skip_all, fields(model = %request.model, turns = request.messages.len()))]
    fn send(&self, request: &ModelRequest) -> Result<ModelResponse, TransportError> {
        info!(endpoint = %self.endpoint, "sending model request");
        let response = self
            .client
            .post(&self.endpoint)
            .header(HDR_X_API_KEY, &self.api_key)
            .header(HDR_ANTHROPIC_VERSION, ANTHROPIC_VERSION)
            .json(request)
            .send()?;

        let status = response.status();
        let body = response.text()?;
        if !status.is_success() {
            warn!(status = status.as_u16(), "model request failed");
            return Err(TransportError::Status {
                status: status.as_u16(),
                body: truncate(&body, 500),
            });
        }

        let parsed: ModelResponse = serde_json::from_str(&body)?;
        debug!(
            stop_reason = ?parsed.stop_reason,
            blocks = parsed.content.len(),
            "model response parsed"
        );
        Ok(parsed)
    }
}

fn truncate(text: &str, limit: usize) -> String {
    if text.len() <= limit {
        return text.to_string();
    }
    let mut end = limit;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}... [truncated]", &text[..end])
}
