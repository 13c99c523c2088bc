//! Prompt building - turning caller intents into parseable prompts.
//!
//! Every builder produces the same canonical shape, [`RawPrompt`]: a message
//! string plus a parse step that turns the raw model completion into either a
//! typed payload or a corrective retry prompt. The conversation engine only
//! ever sees `RawPrompt` values; coercion from higher-level intents (plain
//! text, boolean, JSON-schema, bullet list) happens here, at the boundary.

pub mod extract;

mod boolean;
mod bullet_points;
mod json;
mod schema;
mod text;

pub use boolean::boolean;
pub use bullet_points::{bullet_points, BulletPointsPrompt};
pub use json::{json, JsonPrompt, ResponseParser};
pub use schema::{StringArraySchema, TypedSchema};
pub use text::text;

use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;

use crate::ports::model::Completion;

/// Parse step attached to a prompt.
///
/// Takes the raw completion and resolves to a [`ParseOutcome`]. The step is
/// async because validation may itself consult a model (for example a
/// fact-checking chat inside the parse of a summary prompt).
pub type ParseFn<T> = Arc<dyn Fn(Completion) -> BoxFuture<'static, ParseOutcome<T>> + Send + Sync>;

/// Outcome of a parse step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseOutcome<T> {
    /// The response was accepted and converted into typed data.
    Success { data: T },
    /// The response was rejected. A `retry_prompt` asks the model to correct
    /// itself; its absence makes the failure terminal regardless of any
    /// remaining retry budget.
    Failure { retry_prompt: Option<String> },
}

impl<T> ParseOutcome<T> {
    /// Accepts the response with the given payload.
    pub fn success(data: T) -> Self {
        Self::Success { data }
    }

    /// Rejects the response with a corrective prompt for the model.
    pub fn retry(prompt: impl Into<String>) -> Self {
        Self::Failure {
            retry_prompt: Some(prompt.into()),
        }
    }

    /// Rejects the response terminally - no retry will be attempted.
    pub fn fail() -> Self {
        Self::Failure { retry_prompt: None }
    }

    /// Returns true for [`ParseOutcome::Success`].
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

/// A prompt in the canonical shape the conversation engine consumes.
///
/// Immutable value object: the retry loop derives successors by building new
/// prompts, it never mutates one in place.
pub struct RawPrompt<T> {
    /// The user-visible message sent to the model.
    pub message: String,
    /// Parse step applied to the model's completion.
    pub parse: ParseFn<T>,
    /// Corrective re-prompt budget for this request. `None` uses
    /// [`crate::config::PROMPT_DEFAULT_RETRIES`].
    pub prompt_retries: Option<u32>,
}

impl<T> RawPrompt<T> {
    /// Creates a prompt with the given message and parse step.
    pub fn new<F, Fut>(message: impl Into<String>, parse: F) -> Self
    where
        F: Fn(Completion) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ParseOutcome<T>> + Send + 'static,
    {
        Self {
            message: message.into(),
            parse: Arc::new(move |completion| -> BoxFuture<'static, ParseOutcome<T>> {
                Box::pin(parse(completion))
            }),
            prompt_retries: None,
        }
    }

    /// Replaces the parse step.
    pub fn with_parse<F, Fut>(mut self, parse: F) -> Self
    where
        F: Fn(Completion) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ParseOutcome<T>> + Send + 'static,
    {
        self.parse = Arc::new(move |completion| -> BoxFuture<'static, ParseOutcome<T>> {
            Box::pin(parse(completion))
        });
        self
    }

    /// Sets the corrective re-prompt budget.
    pub fn with_retries(mut self, retries: u32) -> Self {
        self.prompt_retries = Some(retries);
        self
    }
}

impl<T> Clone for RawPrompt<T> {
    fn clone(&self) -> Self {
        Self {
            message: self.message.clone(),
            parse: Arc::clone(&self.parse),
            prompt_retries: self.prompt_retries,
        }
    }
}

impl<T> std::fmt::Debug for RawPrompt<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RawPrompt")
            .field("message", &self.message)
            .field("prompt_retries", &self.prompt_retries)
            .finish_non_exhaustive()
    }
}

/// Plain strings coerce to text prompts at the API boundary.
impl From<&str> for RawPrompt<String> {
    fn from(message: &str) -> Self {
        text(message)
    }
}

impl From<String> for RawPrompt<String> {
    fn from(message: String) -> Self {
        text(message)
    }
}
