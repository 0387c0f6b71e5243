//! OpenAI-compatible provider implementation

use super::{ChatRequest, ChatResponse, Completion, Message, Provider};
use crate::config::Endpoint;
use crate::error::InvokeError;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::Deserialize;
use std::error::Error as _;
use std::time::Duration;

/// Sampling temperature used when none is configured
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

/// Per-request timeout used when none is configured
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Error bodies longer than this are cut in failure messages
const MAX_ERROR_BODY: usize = 500;

/// Provider for any server exposing `POST /chat/completions`
///
/// One `reqwest::Client` is shared across all models. It is safe to clone and
/// to use from concurrent tasks.
#[derive(Debug, Clone)]
pub struct OpenAIProvider {
    client: Client,
    temperature: f32,
    timeout: Duration,
}

/// Response body of `GET /models`
#[derive(Debug, Deserialize)]
struct ModelList {
    #[serde(default)]
    data: Vec<ModelInfo>,
}

#[derive(Debug, Deserialize)]
struct ModelInfo {
    id: String,
}

impl OpenAIProvider {
    /// Create a provider with the given per-request timeout
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            temperature: DEFAULT_TEMPERATURE,
            timeout,
        })
    }

    /// Set the sampling temperature
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Get the configured timeout
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Get the chat completions endpoint URL
    fn chat_url(base_url: &str) -> String {
        format!("{}/chat/completions", base_url.trim_end_matches('/'))
    }

    /// Get the model listing endpoint URL
    fn models_url(base_url: &str) -> String {
        format!("{}/models", base_url.trim_end_matches('/'))
    }

    /// Attach the bearer token unless the key is empty
    fn authorize(builder: RequestBuilder, api_key: &str) -> RequestBuilder {
        if api_key.is_empty() {
            builder
        } else {
            builder.bearer_auth(api_key)
        }
    }

    /// Map a transport error onto the invocation taxonomy
    fn classify(&self, err: reqwest::Error) -> InvokeError {
        let message = error_chain(&err);
        if err.is_timeout() {
            InvokeError::Timeout(self.timeout)
        } else if err.is_builder() {
            InvokeError::Config(message)
        } else if err.is_decode() {
            InvokeError::Protocol(message)
        } else if err.is_connect() || err.is_request() || err.is_body() {
            InvokeError::Network(message)
        } else {
            InvokeError::Unknown(message)
        }
    }

    /// List the model ids served by an OpenAI-compatible proxy
    pub async fn list_models(&self, base_url: &str, api_key: &str) -> Result<Vec<String>> {
        let url = Self::models_url(base_url);
        tracing::debug!("Fetching model list from {}", url);

        let response = Self::authorize(self.client.get(&url), api_key)
            .send()
            .await
            .with_context(|| format!("Could not connect to {}", url))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            anyhow::bail!("Model listing failed ({}): {}", status, truncate(&error_text));
        }

        let list: ModelList = response
            .json()
            .await
            .context("Failed to parse model list")?;

        Ok(list.data.into_iter().map(|m| m.id).collect())
    }
}

#[async_trait]
impl Provider for OpenAIProvider {
    async fn chat(
        &self,
        endpoint: &Endpoint,
        messages: &[Message],
    ) -> Result<Completion, InvokeError> {
        let url = Self::chat_url(&endpoint.base_url);
        let request = ChatRequest {
            model: endpoint.model_id.clone(),
            messages: messages.to_vec(),
            temperature: self.temperature,
        };

        tracing::debug!("POST {} (model {})", url, endpoint.model_id);

        let response = Self::authorize(self.client.post(&url), &endpoint.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| self.classify(e))?;
        tracing::debug!("{} responded {}", endpoint.model_id, status);

        if !status.is_success() {
            return Err(InvokeError::from_status(
                status.as_u16(),
                truncate(body.trim()),
            ));
        }

        let parsed: ChatResponse = serde_json::from_str(&body)
            .map_err(|e| InvokeError::Protocol(format!("invalid response body: {}", e)))?;

        parsed.into_completion()
    }

    fn name(&self) -> &str {
        "openai"
    }
}

/// Join an error with its sources; reqwest's top-level message omits the cause
fn error_chain(err: &reqwest::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

fn truncate(body: &str) -> String {
    if body.chars().count() <= MAX_ERROR_BODY {
        body.to_string()
    } else {
        let cut: String = body.chars().take(MAX_ERROR_BODY).collect();
        format!("{}...", cut)
    }
}
