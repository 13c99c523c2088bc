//! Boolean prompts: force a bare true/false answer out of the model.

use futures::future;

use super::{ParseOutcome, RawPrompt};
use crate::ports::model::Completion;

const FORMAT_PROMPT: &str =
    "Respond to the below prompt only with the word \"true\" or \"false\", nothing else.";
const RETRY_PROMPT: &str =
    "Respond to the prompt above with only the word \"true\" or \"false\", nothing else.";

const TRUTHY_VALUES: [&str; 2] = ["true", "yes"];
const FALSY_VALUES: [&str; 2] = ["false", "no"];

/// Builds a prompt that demands a bare "true"/"false" answer and parses it
/// into a `bool`.
pub fn boolean(message: impl Into<String>) -> RawPrompt<bool> {
    RawPrompt::new(
        format!("{FORMAT_PROMPT}\n\n{}", message.into()),
        |completion: Completion| future::ready(parse_boolean(&completion.content)),
    )
}

/// Models like to add periods, quotes, or a full sentence; strip those and
/// judge the first remaining word.
fn parse_boolean(content: &str) -> ParseOutcome<bool> {
    let cleaned = content.replace(['.', '"', '\''], "").to_lowercase();
    let token = cleaned.split_whitespace().next().unwrap_or("");

    if TRUTHY_VALUES.contains(&token) {
        ParseOutcome::success(true)
    } else if FALSY_VALUES.contains(&token) {
        ParseOutcome::success(false)
    } else {
        ParseOutcome::retry(RETRY_PROMPT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_carries_the_format_instruction() {
        let prompt = boolean("Is water wet?");
        assert!(prompt.message.starts_with(FORMAT_PROMPT));
        assert!(prompt.message.ends_with("Is water wet?"));
    }

    #[test]
    fn parses_punctuated_true() {
        assert_eq!(parse_boolean("True."), ParseOutcome::success(true));
    }

    #[test]
    fn parses_quoted_false() {
        assert_eq!(parse_boolean("\"false\""), ParseOutcome::success(false));
    }

    #[test]
    fn maps_yes_and_no() {
        assert_eq!(parse_boolean("Yes"), ParseOutcome::success(true));
        assert_eq!(parse_boolean("no"), ParseOutcome::success(false));
    }

    #[test]
    fn takes_the_first_word_of_prose() {
        assert_eq!(
            parse_boolean("true, because the sky is blue"),
            ParseOutcome::success(true)
        );
    }

    #[test]
    fn rejects_non_answers_with_a_retry_prompt() {
        match parse_boolean("I cannot answer") {
            ParseOutcome::Failure {
                retry_prompt: Some(prompt),
            } => assert!(!prompt.is_empty()),
            other => panic!("expected retryable failure, got {other:?}"),
        }
    }

    #[test]
    fn rejects_empty_responses() {
        assert!(!parse_boolean("").is_success());
    }
}
