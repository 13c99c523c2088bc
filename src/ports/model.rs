//! Model Provider Port - Interface for chat-completion model integrations.
//!
//! This port abstracts all interactions with the model endpoint (OpenAI or
//! any compatible API), enabling the conversation engine to request
//! completions without coupling to a specific provider.
//!
//! # Design
//!
//! - Provider-agnostic message format
//! - Token counting lives with the provider (it knows its own tokenizer)
//! - Token-budget overflow is a distinguished error carrying the excess, so
//!   the recovery loop can shrink its input proportionally
//!
//! # Example
//!
//! ```ignore
//! use async_trait::async_trait;
//!
//! struct EchoProvider;
//!
//! #[async_trait]
//! impl ModelProvider for EchoProvider {
//!     async fn request(
//!         &self,
//!         messages: &[Message],
//!         _options: &RequestOptions,
//!     ) -> Result<Completion, ModelError> {
//!         Ok(Completion::new(messages.last().map(|m| m.content.clone()).unwrap_or_default()))
//!     }
//!     // ... other methods
//! }
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Port for chat-completion model interactions.
///
/// Implementations connect to external model services and translate between
/// the provider-specific API and our message types. Transport concerns
/// (timeouts, rate-limit back-off, network retries) belong to the
/// implementation; the conversation engine never retries transport failures
/// itself.
#[async_trait]
pub trait ModelProvider: Send + Sync {
    /// Request a completion for the given message transcript.
    ///
    /// Fails with [`ModelError::TokenOverflow`] when the estimated prompt
    /// tokens exceed the model's usable context after reserving room for the
    /// response. All other failures are opaque transport conditions.
    async fn request(
        &self,
        messages: &[Message],
        options: &RequestOptions,
    ) -> Result<Completion, ModelError>;

    /// Estimate the prompt token count for a message transcript.
    fn count_tokens(&self, messages: &[Message]) -> u32;

    /// Get provider information (name, model, context size).
    fn info(&self) -> ProviderInfo;
}

/// A message in the conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Who sent this message.
    pub role: MessageRole,
    /// Message content.
    pub content: String,
}

impl Message {
    /// Creates a new message.
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    /// Creates a system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(MessageRole::System, content)
    }

    /// Creates a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageRole::User, content)
    }

    /// Creates an assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Assistant, content)
    }
}

/// Role of the message sender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// System instructions (guides model behavior).
    System,
    /// User input.
    User,
    /// Assistant (model) response.
    Assistant,
}

/// Per-request options, merged over the engine's configured defaults.
///
/// Every field is optional; `None` means "use the next layer's default".
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    /// Transport-level retries for recoverable API errors.
    pub retries: Option<u32>,
    /// Initial wait between transport retries (doubles per retry).
    pub retry_interval: Option<Duration>,
    /// Per-call timeout.
    pub timeout: Option<Duration>,
    /// Minimum tokens to reserve for the response. If the prompt is predicted
    /// to leave less than this, the provider fails with
    /// [`ModelError::TokenOverflow`] without sending the request.
    pub minimum_response_tokens: Option<u32>,
    /// Override the messages used for completion. Used by the engine to pin
    /// a rejected turn as context during retry recursion.
    pub messages: Option<Vec<Message>>,
}

impl RequestOptions {
    /// Creates empty options (all defaults apply).
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the transport retry count.
    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = Some(retries);
        self
    }

    /// Sets the initial transport retry interval.
    pub fn with_retry_interval(mut self, interval: Duration) -> Self {
        self.retry_interval = Some(interval);
        self
    }

    /// Sets the per-call timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Sets the reserved response token budget.
    pub fn with_minimum_response_tokens(mut self, tokens: u32) -> Self {
        self.minimum_response_tokens = Some(tokens);
        self
    }

    /// Pins the outgoing message list, replacing the live transcript.
    pub fn with_messages(mut self, messages: Vec<Message>) -> Self {
        self.messages = Some(messages);
        self
    }

    /// Merges these options over `defaults`, explicit values winning.
    pub fn merged_over(&self, defaults: &RequestOptions) -> RequestOptions {
        RequestOptions {
            retries: self.retries.or(defaults.retries),
            retry_interval: self.retry_interval.or(defaults.retry_interval),
            timeout: self.timeout.or(defaults.timeout),
            minimum_response_tokens: self
                .minimum_response_tokens
                .or(defaults.minimum_response_tokens),
            messages: self
                .messages
                .clone()
                .or_else(|| defaults.messages.clone()),
        }
    }
}

/// Raw completion returned by a model provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    /// Generated text content.
    pub content: String,
    /// Token usage, when the provider reports it.
    pub usage: Option<TokenUsage>,
}

impl Completion {
    /// Creates a completion without usage information.
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            usage: None,
        }
    }

    /// Attaches usage information.
    pub fn with_usage(mut self, usage: TokenUsage) -> Self {
        self.usage = Some(usage);
        self
    }
}

/// Token usage reported for a completion.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Tokens in the prompt.
    pub prompt_tokens: u32,
    /// Tokens in the completion.
    pub completion_tokens: u32,
    /// Total tokens (prompt + completion).
    pub total_tokens: u32,
}

impl TokenUsage {
    /// Creates new token usage.
    pub fn new(prompt_tokens: u32, completion_tokens: u32) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
        }
    }
}

/// Provider information.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderInfo {
    /// Provider name (e.g., "openai").
    pub name: String,
    /// Model identifier (e.g., "gpt-4o-mini").
    pub model: String,
    /// Maximum context window size in tokens.
    pub max_context_tokens: u32,
}

impl ProviderInfo {
    /// Creates new provider info.
    pub fn new(name: impl Into<String>, model: impl Into<String>, max_context_tokens: u32) -> Self {
        Self {
            name: name.into(),
            model: model.into(),
            max_context_tokens,
        }
    }
}

/// Model provider errors.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    /// Prompt exceeds the usable token budget. Carries the excess so the
    /// overflow recovery loop can react; this is the only variant it acts on.
    #[error("prompt too large: {overflow_tokens} tokens over budget")]
    TokenOverflow {
        /// How many tokens the prompt exceeded its budget by.
        overflow_tokens: u32,
    },

    /// Rate limited by the provider.
    #[error("rate limited: retry after {retry_after_secs}s")]
    RateLimited {
        /// Seconds until retry is allowed.
        retry_after_secs: u32,
    },

    /// Request timed out.
    #[error("request timed out after {timeout_secs}s")]
    Timeout {
        /// Configured timeout.
        timeout_secs: u32,
    },

    /// Network error during request.
    #[error("network error: {0}")]
    Network(String),

    /// API key or authentication failed.
    #[error("authentication failed")]
    AuthenticationFailed,

    /// Provider is unavailable.
    #[error("provider unavailable: {message}")]
    Unavailable {
        /// Error details.
        message: String,
    },

    /// Failed to parse the provider response.
    #[error("parse error: {0}")]
    Parse(String),

    /// Invalid request configuration.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl ModelError {
    /// Creates a token overflow error.
    pub fn token_overflow(overflow_tokens: u32) -> Self {
        Self::TokenOverflow { overflow_tokens }
    }

    /// Creates a rate limited error.
    pub fn rate_limited(retry_after_secs: u32) -> Self {
        Self::RateLimited { retry_after_secs }
    }

    /// Creates a network error.
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network(message.into())
    }

    /// Creates an unavailable error.
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    /// Creates a parse error.
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse(message.into())
    }

    /// Returns true if this error is worth a transport-level retry.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ModelError::RateLimited { .. }
                | ModelError::Unavailable { .. }
                | ModelError::Network(_)
                | ModelError::Timeout { .. }
        )
    }
}
