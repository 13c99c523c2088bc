//! Conversation engine - the request/validate/retry loop.
//!
//! A [`Chat`] owns exactly one transcript, one config, and one model handle.
//! Each `request` call is a bounded, self-correcting sequence of model calls:
//! the response is parsed, and on a recoverable parse failure the engine
//! re-prompts the model with corrective feedback, keeping the rejected turn
//! visible as context without committing it to the durable transcript.
//!
//! The transcript is a snapshot: successful turns replace it wholesale (when
//! memory retention is on), nothing ever edits it in place. At most one
//! request may be in flight per engine, which `&mut self` encodes.

use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use crate::config;
use crate::domain::prompt::{ParseOutcome, RawPrompt};
use crate::domain::splitter::SplitterError;
use crate::ports::model::{Message, ModelError, ModelProvider, RequestOptions, TokenUsage};

use super::persona::Persona;

/// Engine-level configuration.
#[derive(Debug, Clone, Default)]
pub struct ChatConfig {
    /// Whether successful turns are committed to the transcript. When
    /// enabled the chat behaves like a user chat room: the model sees the
    /// history of every prior successful turn. Defaults to off.
    pub retain_memory: bool,
    /// Default request options, overridable per request.
    pub default_options: RequestOptions,
}

impl ChatConfig {
    /// Creates a config with memory retention off.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets whether successful turns are committed to the transcript.
    pub fn with_retain_memory(mut self, retain: bool) -> Self {
        self.retain_memory = retain;
        self
    }

    /// Sets the default request options.
    pub fn with_default_options(mut self, options: RequestOptions) -> Self {
        self.default_options = options;
        self
    }
}

/// Typed response returned by the engine.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatResponse<T> {
    /// Parsed payload; the raw completion text for plain text prompts.
    pub content: T,
    /// Token usage of the final (accepted) completion, when reported.
    pub usage: Option<TokenUsage>,
}

/// Conversation-level errors.
#[derive(Debug, Error)]
pub enum ChatError {
    /// The model capability failed. Token overflow and transport failures
    /// surface here unchanged so callers can tell them apart.
    #[error(transparent)]
    Model(#[from] ModelError),

    /// The model returned an empty response.
    #[error("chat request failed: the model returned an empty response")]
    EmptyResponse,

    /// Every parse attempt was rejected and the retry budget is exhausted,
    /// or the parse step declined to supply a corrective prompt.
    #[error("response parsing failed after {attempts} attempts")]
    ResponseParsing { attempts: u32 },

    /// Overflow recovery bottomed out: halving the chunk size again would
    /// fall below the configured minimum.
    #[error("cannot shrink prompt below {min_chunk_size} characters (chunk size {chunk_size})")]
    CannotShrink {
        chunk_size: usize,
        min_chunk_size: usize,
    },

    /// Invalid splitter configuration.
    #[error(transparent)]
    Splitter(#[from] SplitterError),
}

/// A conversation with a model: one transcript, one config, one model handle.
pub struct Chat {
    persona: Persona,
    config: ChatConfig,
    model: Arc<dyn ModelProvider>,
    messages: Vec<Message>,
}

impl Chat {
    /// Creates a conversation seeded with the persona's system message.
    pub fn new(persona: Persona, config: ChatConfig, model: Arc<dyn ModelProvider>) -> Self {
        let messages = vec![Message::system(persona.system_message())];
        Self {
            persona,
            config,
            model,
            messages,
        }
    }

    /// The current transcript.
    pub fn transcript(&self) -> &[Message] {
        &self.messages
    }

    /// The engine configuration.
    pub fn config(&self) -> &ChatConfig {
        &self.config
    }

    /// Truncates the transcript back to the seed system message. Only affects
    /// future requests, never an in-flight one.
    pub fn reset(&mut self) {
        self.messages = vec![Message::system(self.persona.system_message())];
    }

    /// Sends `prompt` to the model, parsing and retrying until the response
    /// conforms or the budget runs out.
    ///
    /// Retries re-prompt the model with the parse step's corrective message,
    /// pinning the rejected turn as context so the model can see what it got
    /// wrong. Only the finally-accepted turn chain is committed to the
    /// transcript, and only when memory retention is on.
    ///
    /// A retry budget of zero still performs the first attempt.
    pub async fn request<T>(
        &mut self,
        prompt: RawPrompt<T>,
        opt: Option<RequestOptions>,
    ) -> Result<ChatResponse<T>, ChatError> {
        let options = opt
            .unwrap_or_default()
            .merged_over(&self.config.default_options);

        let mut retries_remaining = prompt
            .prompt_retries
            .unwrap_or(config::PROMPT_DEFAULT_RETRIES);
        let mut message = prompt.message.clone();
        let mut context = options
            .messages
            .clone()
            .unwrap_or_else(|| self.messages.clone());
        let mut attempts = 0u32;

        loop {
            attempts += 1;
            let mut outgoing = context;
            outgoing.push(Message::user(message.clone()));

            debug!(
                attempt = attempts,
                messages = outgoing.len(),
                "dispatching chat completion"
            );
            let completion = self.model.request(&outgoing, &options).await?;
            if completion.content.is_empty() {
                return Err(ChatError::EmptyResponse);
            }

            let usage = completion.usage.clone();
            let mut with_response = outgoing;
            with_response.push(Message::assistant(completion.content.clone()));

            match (prompt.parse)(completion).await {
                ParseOutcome::Success { data } => {
                    if self.config.retain_memory {
                        self.messages = with_response;
                    }
                    return Ok(ChatResponse {
                        content: data,
                        usage,
                    });
                }
                ParseOutcome::Failure {
                    retry_prompt: Some(retry_prompt),
                } if retries_remaining > 0 && !retry_prompt.is_empty() => {
                    retries_remaining -= 1;
                    debug!(
                        retries_remaining,
                        "response rejected by parse step, re-prompting with corrective message"
                    );
                    message = retry_prompt;
                    context = with_response;
                }
                ParseOutcome::Failure { .. } => {
                    return Err(ChatError::ResponseParsing { attempts });
                }
            }
        }
    }
}

impl std::fmt::Debug for Chat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Chat")
            .field("persona", &self.persona)
            .field("config", &self.config)
            .field("messages", &self.messages.len())
            .finish_non_exhaustive()
    }
}
