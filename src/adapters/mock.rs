//! Mock Model Provider for testing.
//!
//! Provides a configurable mock implementation of the ModelProvider port,
//! allowing the engine's retry and overflow paths to be driven without any
//! network access.
//!
//! # Features
//!
//! - Scripted replies, consumed in order
//! - Error injection (token overflow, transport failures)
//! - Call capture for verifying what the engine actually sent
//!
//! # Example
//!
//! ```ignore
//! let provider = Arc::new(
//!     MockModelProvider::new()
//!         .with_reply("not valid")
//!         .with_reply("true"),
//! );
//!
//! let mut chat = Chat::new(persona, config, provider.clone());
//! let response = chat.request(prompt::boolean("Is water wet?"), None).await?;
//! assert_eq!(provider.call_count(), 2);
//! ```

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::ports::model::{
    Completion, Message, ModelError, ModelProvider, ProviderInfo, RequestOptions, TokenUsage,
};

/// A scripted mock reply.
#[derive(Debug)]
pub enum MockReply {
    /// Return a successful completion with this content.
    Success(String),
    /// Return this error.
    Error(ModelError),
}

/// Behavior once the scripted replies run out.
#[derive(Debug, Clone)]
enum Fallback {
    /// Keep returning this content.
    Reply(String),
    /// Keep failing with token overflow carrying this excess.
    TokenOverflow { overflow_tokens: u32 },
}

/// Mock model provider for testing.
pub struct MockModelProvider {
    /// Scripted replies, consumed front to back.
    replies: Mutex<VecDeque<MockReply>>,
    /// Behavior after the script is exhausted.
    fallback: Fallback,
    /// Captured message lists, one per request.
    calls: Mutex<Vec<Vec<Message>>>,
    /// Usage attached to successful completions.
    usage: Option<TokenUsage>,
}

impl MockModelProvider {
    /// Creates a mock that answers "mock response" to everything.
    pub fn new() -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
            fallback: Fallback::Reply("mock response".to_string()),
            calls: Mutex::new(Vec::new()),
            usage: None,
        }
    }

    /// Queues a successful reply.
    pub fn with_reply(self, content: impl Into<String>) -> Self {
        self.replies
            .lock()
            .expect("mock replies lock poisoned")
            .push_back(MockReply::Success(content.into()));
        self
    }

    /// Queues an error reply.
    pub fn with_error(self, error: ModelError) -> Self {
        self.replies
            .lock()
            .expect("mock replies lock poisoned")
            .push_back(MockReply::Error(error));
        self
    }

    /// Makes every unscripted request fail with token overflow.
    pub fn with_overflow_fallback(mut self, overflow_tokens: u32) -> Self {
        self.fallback = Fallback::TokenOverflow { overflow_tokens };
        self
    }

    /// Changes the content returned once the script is exhausted.
    pub fn with_fallback_reply(mut self, content: impl Into<String>) -> Self {
        self.fallback = Fallback::Reply(content.into());
        self
    }

    /// Attaches usage to every successful completion.
    pub fn with_usage(mut self, usage: TokenUsage) -> Self {
        self.usage = Some(usage);
        self
    }

    /// Number of requests received.
    pub fn call_count(&self) -> usize {
        self.calls.lock().expect("mock calls lock poisoned").len()
    }

    /// The message lists received, one per request.
    pub fn calls(&self) -> Vec<Vec<Message>> {
        self.calls
            .lock()
            .expect("mock calls lock poisoned")
            .clone()
    }

    /// The messages of the most recent request.
    pub fn last_call(&self) -> Option<Vec<Message>> {
        self.calls
            .lock()
            .expect("mock calls lock poisoned")
            .last()
            .cloned()
    }
}

impl Default for MockModelProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ModelProvider for MockModelProvider {
    async fn request(
        &self,
        messages: &[Message],
        _options: &RequestOptions,
    ) -> Result<Completion, ModelError> {
        self.calls
            .lock()
            .expect("mock calls lock poisoned")
            .push(messages.to_vec());

        let scripted = self
            .replies
            .lock()
            .expect("mock replies lock poisoned")
            .pop_front();

        match scripted {
            Some(MockReply::Success(content)) => Ok(Completion {
                content,
                usage: self.usage.clone(),
            }),
            Some(MockReply::Error(error)) => Err(error),
            None => match &self.fallback {
                Fallback::Reply(content) => Ok(Completion {
                    content: content.clone(),
                    usage: self.usage.clone(),
                }),
                Fallback::TokenOverflow { overflow_tokens } => {
                    Err(ModelError::token_overflow(*overflow_tokens))
                }
            },
        }
    }

    fn count_tokens(&self, messages: &[Message]) -> u32 {
        messages
            .iter()
            .map(|m| (m.content.chars().count() / 4).max(1) as u32)
            .sum()
    }

    fn info(&self) -> ProviderInfo {
        ProviderInfo::new("mock", "mock-model", 4096)
    }
}
