//! Token-overflow recovery: retry a request with a shrinking slice of the
//! input text.
//!
//! Reacts only to [`ModelError::TokenOverflow`]; every other failure belongs
//! to someone else and propagates unchanged. The loop halves the chunk size
//! on each overflow, re-splits the original text, and retries with the first
//! chunk. It terminates because the chunk size strictly decreases toward the
//! configured minimum.

use tracing::warn;

use crate::config;
use crate::domain::prompt::RawPrompt;
use crate::domain::splitter::{RecursiveCharacterTextSplitter, SplitterConfig, TextSplitter};
use crate::ports::model::{ModelError, RequestOptions};

use super::engine::{Chat, ChatError, ChatResponse};

/// Bounds for the overflow recovery loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SplitOptions {
    /// Chunk size for the first shrink attempt.
    pub chunk_size: usize,
    /// Smallest chunk size to shrink to before giving up.
    pub min_chunk_size: usize,
}

impl SplitOptions {
    /// Creates bounds with the given starting and minimum chunk sizes.
    pub fn new(chunk_size: usize, min_chunk_size: usize) -> Self {
        Self {
            chunk_size,
            min_chunk_size,
        }
    }
}

impl Default for SplitOptions {
    fn default() -> Self {
        Self {
            chunk_size: config::DEFAULT_CHUNK_SIZE,
            min_chunk_size: config::MIN_CHUNK_SIZE,
        }
    }
}

impl Chat {
    /// Requests a completion for `text`, shrinking the text on token
    /// overflow until the request fits or the chunk size bottoms out.
    ///
    /// `build_prompt` is invoked for every attempt with the text slice to
    /// send. On [`ModelError::TokenOverflow`] the chunk size is halved, the
    /// ORIGINAL text is re-split, and the first chunk is retried; once
    /// halving would fall below `split.min_chunk_size` the loop fails with
    /// [`ChatError::CannotShrink`].
    pub async fn request_with_split<T, F>(
        &mut self,
        text: &str,
        build_prompt: F,
        opt: Option<RequestOptions>,
        split: SplitOptions,
    ) -> Result<ChatResponse<T>, ChatError>
    where
        F: Fn(&str) -> RawPrompt<T>,
    {
        let mut chunk_size = split.chunk_size;
        let mut current = text.to_string();

        loop {
            match self.request(build_prompt(&current), opt.clone()).await {
                Ok(response) => return Ok(response),
                Err(ChatError::Model(ModelError::TokenOverflow { overflow_tokens })) => {
                    let halved = chunk_size / 2;
                    if halved < split.min_chunk_size {
                        return Err(ChatError::CannotShrink {
                            chunk_size,
                            min_chunk_size: split.min_chunk_size,
                        });
                    }
                    warn!(
                        overflow_tokens,
                        chunk_size = halved,
                        "prompt overflowed the token budget, retrying with a smaller chunk"
                    );
                    chunk_size = halved;
                    let overlap = (chunk_size / 4).min(config::SPLIT_OVERLAP_CAP);
                    let splitter = RecursiveCharacterTextSplitter::new(SplitterConfig::new(
                        chunk_size, overlap,
                    )?);
                    current = splitter.split_text(text).into_iter().next().unwrap_or_default();
                }
                Err(other) => return Err(other),
            }
        }
    }
}
