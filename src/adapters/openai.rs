//! OpenAI Provider - Implementation of ModelProvider for OpenAI's chat API.
//!
//! # Configuration
//!
//! ```ignore
//! let config = OpenAiConfig::new(api_key)
//!     .with_model("gpt-4o-mini")
//!     .with_context_size(128_000);
//!
//! let provider = OpenAiProvider::new(config);
//! ```
//!
//! # Token budget
//!
//! Before any network call, the prompt is checked against the configured
//! context size minus the reserved response allowance. A prompt predicted to
//! overflow fails immediately with [`ModelError::TokenOverflow`] carrying the
//! excess, which the overflow recovery loop reacts to.
//!
//! # Transport retries
//!
//! Rate limits, server errors, timeouts, and connection failures are retried
//! up to the configured budget with the wait doubling per attempt. Nothing
//! else is retried here; parse failures belong to the conversation engine.

use std::time::Duration;

use reqwest::Client;
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::config::{
    COMPLETION_DEFAULT_RETRIES, COMPLETION_DEFAULT_TIMEOUT, DEFAULT_CONTEXT_ALLOWANCE,
    MINIMUM_RESPONSE_TOKENS, RATE_LIMIT_RETRY_INTERVAL,
};
use crate::ports::model::{
    Completion, Message, ModelError, ModelProvider, ProviderInfo, RequestOptions, TokenUsage,
};

use async_trait::async_trait;

/// Configuration for the OpenAI provider.
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    /// API key for authentication.
    api_key: Secret<String>,
    /// Model to use (e.g., "gpt-4o-mini").
    pub model: String,
    /// Base URL for the API.
    pub base_url: String,
    /// Context window size in tokens. `None` assumes a generous allowance and
    /// effectively disables the overflow pre-check for small prompts.
    pub context_size: Option<u32>,
    /// Sampling temperature passthrough.
    pub temperature: Option<f32>,
    /// Nucleus sampling passthrough.
    pub top_p: Option<f32>,
    /// Maximum tokens to generate.
    pub max_tokens: Option<u32>,
    /// Request timeout.
    pub timeout: Duration,
    /// Maximum transport retries on recoverable failures.
    pub max_retries: u32,
    /// Initial wait between transport retries (doubles per retry).
    pub retry_interval: Duration,
}

impl OpenAiConfig {
    /// Creates a new configuration with the given API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: Secret::new(api_key.into()),
            model: "gpt-4o-mini".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
            context_size: None,
            temperature: None,
            top_p: None,
            max_tokens: None,
            timeout: COMPLETION_DEFAULT_TIMEOUT,
            max_retries: COMPLETION_DEFAULT_RETRIES,
            retry_interval: RATE_LIMIT_RETRY_INTERVAL,
        }
    }

    /// Sets the model to use.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Sets the base URL.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Sets the context window size used by the overflow pre-check.
    pub fn with_context_size(mut self, tokens: u32) -> Self {
        self.context_size = Some(tokens);
        self
    }

    /// Sets the sampling temperature.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Sets the nucleus sampling parameter.
    pub fn with_top_p(mut self, top_p: f32) -> Self {
        self.top_p = Some(top_p);
        self
    }

    /// Sets the maximum tokens to generate.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the maximum transport retry count.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Sets the initial transport retry interval.
    pub fn with_retry_interval(mut self, interval: Duration) -> Self {
        self.retry_interval = interval;
        self
    }

    /// Exposes the API key (for making requests).
    fn api_key(&self) -> &str {
        self.api_key.expose_secret()
    }
}

/// OpenAI API provider implementation.
pub struct OpenAiProvider {
    config: OpenAiConfig,
    client: Client,
}

impl OpenAiProvider {
    /// Creates a new OpenAI provider with the given configuration.
    pub fn new(config: OpenAiConfig) -> Self {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .expect("Failed to create HTTP client");

        Self { config, client }
    }

    /// Builds the chat completions endpoint URL.
    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.config.base_url)
    }

    /// Prompt-token budget given the reserved response allowance.
    fn max_prompt_tokens(&self, minimum_response_tokens: u32) -> u32 {
        match self.config.context_size {
            Some(context) => context.saturating_sub(minimum_response_tokens),
            None => DEFAULT_CONTEXT_ALLOWANCE,
        }
    }

    /// One completion attempt, no retries.
    async fn try_complete(
        &self,
        messages: &[Message],
        timeout: Duration,
    ) -> Result<Completion, ModelError> {
        let request = ChatCompletionRequest {
            model: &self.config.model,
            messages,
            temperature: self.config.temperature,
            top_p: self.config.top_p,
            max_tokens: self.config.max_tokens,
        };

        let response = self
            .client
            .post(self.completions_url())
            .timeout(timeout)
            .header("Authorization", format!("Bearer {}", self.config.api_key()))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ModelError::Timeout {
                        timeout_secs: timeout.as_secs() as u32,
                    }
                } else if e.is_connect() {
                    ModelError::network(format!("Connection failed: {}", e))
                } else {
                    ModelError::network(e.to_string())
                }
            })?;

        let response = self.handle_response_status(response).await?;

        let body: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| ModelError::parse(format!("Failed to parse response: {}", e)))?;

        let choice = body
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ModelError::parse("No choices in response"))?;

        let content = choice
            .message
            .content
            .filter(|content| !content.is_empty())
            .ok_or_else(|| ModelError::parse("Completion response contained no content"))?;

        let usage = body
            .usage
            .map(|u| TokenUsage::new(u.prompt_tokens, u.completion_tokens));

        Ok(Completion {
            content,
            usage,
        })
    }

    /// Maps API error statuses onto the error taxonomy.
    async fn handle_response_status(
        &self,
        response: reqwest::Response,
    ) -> Result<reqwest::Response, ModelError> {
        let status = response.status();

        if status.is_success() {
            return Ok(response);
        }

        let error_body = response.text().await.unwrap_or_default();

        match status.as_u16() {
            401 => Err(ModelError::AuthenticationFailed),
            429 => Err(ModelError::rate_limited(parse_retry_after(&error_body))),
            400 => Err(ModelError::InvalidRequest(error_body)),
            500..=599 => Err(ModelError::unavailable(format!(
                "Server error {}: {}",
                status, error_body
            ))),
            _ => Err(ModelError::network(format!(
                "Unexpected status {}: {}",
                status, error_body
            ))),
        }
    }
}

#[async_trait]
impl ModelProvider for OpenAiProvider {
    async fn request(
        &self,
        messages: &[Message],
        options: &RequestOptions,
    ) -> Result<Completion, ModelError> {
        // Check the token budget before spending a network round-trip.
        let minimum_response = options
            .minimum_response_tokens
            .unwrap_or(MINIMUM_RESPONSE_TOKENS);
        let max_prompt_tokens = self.max_prompt_tokens(minimum_response);
        let prompt_tokens = self.count_tokens(messages);
        if prompt_tokens > max_prompt_tokens {
            return Err(ModelError::token_overflow(
                prompt_tokens - max_prompt_tokens,
            ));
        }

        let max_retries = options.retries.unwrap_or(self.config.max_retries);
        let timeout = options.timeout.unwrap_or(self.config.timeout);
        let mut interval = options
            .retry_interval
            .unwrap_or(self.config.retry_interval);
        let mut attempt = 0u32;

        debug!(
            model = %self.config.model,
            messages = messages.len(),
            prompt_tokens,
            "sending chat completion request"
        );

        loop {
            match self.try_complete(messages, timeout).await {
                Ok(completion) => return Ok(completion),
                Err(err) if err.is_retryable() && attempt < max_retries => {
                    warn!(
                        attempt,
                        error = %err,
                        "completion failed, retrying after back-off"
                    );
                    sleep(interval).await;
                    interval *= 2;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    fn count_tokens(&self, messages: &[Message]) -> u32 {
        // ~4 characters per token, plus per-message framing and the primed
        // assistant reply. A rough estimate; exactness is not required
        // because a response allowance is reserved anyway.
        let mut tokens: u32 = 0;
        for message in messages {
            tokens += 5;
            tokens += estimate_tokens(&message.content);
        }
        tokens + 2
    }

    fn info(&self) -> ProviderInfo {
        ProviderInfo::new(
            "openai",
            &self.config.model,
            self.config.context_size.unwrap_or(DEFAULT_CONTEXT_ALLOWANCE),
        )
    }
}

/// ~4 characters per token.
fn estimate_tokens(text: &str) -> u32 {
    ((text.chars().count() / 4).max(1)) as u32
}

/// Parses a "try again in Xs" hint out of a rate-limit error body.
fn parse_retry_after(error_body: &str) -> u32 {
    if let Ok(parsed) = serde_json::from_str::<serde_json::Value>(error_body) {
        if let Some(message) = parsed
            .get("error")
            .and_then(|e| e.get("message"))
            .and_then(|m| m.as_str())
        {
            if let Some(idx) = message.find("try again in ") {
                let rest = &message[idx + 13..];
                if let Some(num_end) = rest.find(|c: char| !c.is_ascii_digit()) {
                    if let Ok(secs) = rest[..num_end].parse::<u32>() {
                        return secs;
                    }
                }
            }
        }
    }
    30
}

// ----- OpenAI API Types -----

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
    usage: Option<WireUsage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: WireMessage,
}

#[derive(Debug, Deserialize)]
struct WireMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}
