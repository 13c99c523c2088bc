//! Plain text prompts.

use futures::future;

use super::{ParseOutcome, RawPrompt};
use crate::ports::model::Completion;

/// Builds a prompt whose raw model response is the accepted payload.
///
/// A custom parse step (for example one that fact-checks the response with a
/// second chat) can be attached with [`RawPrompt::with_parse`].
pub fn text(message: impl Into<String>) -> RawPrompt<String> {
    RawPrompt::new(message, |completion: Completion| {
        future::ready(ParseOutcome::success(completion.content))
    })
}
