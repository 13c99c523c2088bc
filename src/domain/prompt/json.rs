//! JSON prompts: extract, parse, and schema-validate structured output.
//!
//! The parse step is deliberately forgiving on the way in (code fences are
//! stripped, the widest JSON-looking span is taken) and strict on the way out
//! (the schema decides). Validation failures become corrective retry prompts
//! that quote the offending value and name its location, so the model knows
//! exactly what to fix. Nothing in here panics or propagates parse errors -
//! every failure mode folds into a retry prompt.

use std::sync::Arc;

use futures::future;
use serde_json::Value;

use super::extract::{extract_json_array, extract_json_object};
use super::{ParseOutcome, RawPrompt};
use crate::ports::model::Completion;
use crate::ports::schema::{Issue, PathSegment, Schema};

const NO_JSON_RETRY: &str = "No valid JSON was found in the response, try again.";

/// Custom extraction step: turns the raw response text into the JSON value
/// handed to the schema.
pub type ResponseParser = Arc<dyn Fn(&str) -> Value + Send + Sync>;

/// A JSON-validated prompt intent.
pub struct JsonPrompt<S> {
    /// The user-visible message. Format instructions belong in here.
    pub message: String,
    /// Schema the extracted value must satisfy.
    pub schema: S,
    /// Custom extraction replacing the default JSON-span heuristics.
    pub parse_response: Option<ResponseParser>,
    /// Message prefixed to every corrective retry prompt, and used instead of
    /// the generic line when no JSON is found.
    pub retry_message: Option<String>,
    /// Corrective re-prompt budget.
    pub prompt_retries: Option<u32>,
}

impl<S> JsonPrompt<S> {
    /// Creates a JSON prompt with the given message and schema.
    pub fn new(message: impl Into<String>, schema: S) -> Self {
        Self {
            message: message.into(),
            schema,
            parse_response: None,
            retry_message: None,
            prompt_retries: None,
        }
    }

    /// Sets a custom extraction step.
    pub fn with_parse_response(
        mut self,
        parse: impl Fn(&str) -> Value + Send + Sync + 'static,
    ) -> Self {
        self.parse_response = Some(Arc::new(parse));
        self
    }

    /// Sets the retry message prefix.
    pub fn with_retry_message(mut self, message: impl Into<String>) -> Self {
        self.retry_message = Some(message.into());
        self
    }

    /// Sets the corrective re-prompt budget.
    pub fn with_retries(mut self, retries: u32) -> Self {
        self.prompt_retries = Some(retries);
        self
    }
}

/// Builds a prompt whose response is extracted as JSON and validated against
/// `prompt.schema`.
pub fn json<T, S>(prompt: JsonPrompt<S>) -> RawPrompt<T>
where
    T: Send + 'static,
    S: Schema<T> + 'static,
{
    let schema = Arc::new(prompt.schema);
    let parse_response = prompt.parse_response;
    let retry_message = prompt.retry_message;

    let mut raw = RawPrompt::new(prompt.message, move |completion: Completion| {
        let outcome = parse_completion(
            &completion.content,
            schema.as_ref(),
            parse_response.as_deref(),
            retry_message.as_deref(),
        );
        future::ready(outcome)
    });
    raw.prompt_retries = prompt.prompt_retries;
    raw
}

fn parse_completion<T>(
    content: &str,
    schema: &dyn Schema<T>,
    parse_response: Option<&(dyn Fn(&str) -> Value + Send + Sync)>,
    retry_message: Option<&str>,
) -> ParseOutcome<T> {
    let value = match parse_response {
        Some(custom) => custom(content),
        None => {
            let body = strip_code_fence(content);
            let candidate = match json_candidate(body) {
                Some(candidate) => candidate,
                None => return no_json_retry(retry_message),
            };
            match serde_json::from_str(candidate) {
                Ok(value) => value,
                Err(_) => return no_json_retry(retry_message),
            }
        }
    };

    match schema.safe_parse(&value) {
        Ok(data) => ParseOutcome::success(data),
        Err(issues) => ParseOutcome::retry(correction_prompt(&value, &issues, retry_message)),
    }
}

fn no_json_retry<T>(retry_message: Option<&str>) -> ParseOutcome<T> {
    ParseOutcome::retry(retry_message.unwrap_or(NO_JSON_RETRY))
}

/// The likeliest JSON payload: whichever of the widest object/array spans is
/// larger, i.e. outer-most, when both are present.
fn json_candidate(text: &str) -> Option<&str> {
    match (extract_json_object(text), extract_json_array(text)) {
        (Some(object), Some(array)) => Some(if array.len() > object.len() {
            array
        } else {
            object
        }),
        (Some(object), None) => Some(object),
        (None, Some(array)) => Some(array),
        (None, None) => None,
    }
}

/// Returns the body of the first markdown code fence, or `text` unchanged.
fn strip_code_fence(text: &str) -> &str {
    for pattern in ["```json\n", "```json\r\n", "```\n", "```\r\n"] {
        if let Some(start) = text.find(pattern) {
            let body = &text[start + pattern.len()..];
            if let Some(end) = body.find("```") {
                return body[..end].trim();
            }
        }
    }
    text
}

/// One correction line per issue, quoting the offending value and naming its
/// location; issues with no path collapse into a single generic line.
fn correction_prompt(value: &Value, issues: &[Issue], retry_message: Option<&str>) -> String {
    let mut lines = Vec::new();
    let mut whole_value_reported = false;

    for issue in issues {
        match issue.path.first() {
            None => {
                if !whole_value_reported {
                    lines.push(format!(
                        "There is an issue with the response. The issue is: {}",
                        issue.message
                    ));
                    whole_value_reported = true;
                }
            }
            Some(first) => {
                let shown = value_at(value, &issue.path)
                    .map(display_value)
                    .unwrap_or_default();
                let location = match first {
                    PathSegment::Index(index) => format!("index {index}"),
                    PathSegment::Key(_) => format!("path {}", join_path(&issue.path)),
                };
                lines.push(format!(
                    "There is an issue with the value \"{shown}\", at {location}. The issue is: {}",
                    issue.message
                ));
            }
        }
    }

    let body = lines.join("\n");
    match retry_message {
        Some(prefix) => format!("{prefix}\n{body}").trim().to_string(),
        None => body,
    }
}

/// Walks `path` into `value`, lodash-get style.
fn value_at<'a>(value: &'a Value, path: &[PathSegment]) -> Option<&'a Value> {
    let mut current = value;
    for segment in path {
        current = match segment {
            PathSegment::Key(key) => current.get(key)?,
            PathSegment::Index(index) => current.get(index)?,
        };
    }
    Some(current)
}

/// Strings are shown bare (the surrounding quotes come from the correction
/// line); everything else uses its JSON rendering.
fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn join_path(path: &[PathSegment]) -> String {
    path.iter()
        .map(|segment| segment.to_string())
        .collect::<Vec<_>>()
        .join(".")
}
