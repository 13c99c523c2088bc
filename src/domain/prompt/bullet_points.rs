//! Bullet-point prompts: a constrained list of short strings.
//!
//! Built on top of the JSON prompt with a line-based extraction step, because
//! models follow "reply in bullet points" far more reliably than "reply as a
//! JSON array".

use serde_json::Value;

use super::extract::extract_bullet_points;
use super::json::{json, JsonPrompt};
use super::schema::StringArraySchema;
use super::RawPrompt;

const FORMAT_PROMPT: &str = "Respond to the prompt below in bullet points, where each bullet \
point starts with the - character. Don't include any other text other than the bullet points.";

/// A bullet-point prompt intent.
#[derive(Debug, Clone)]
pub struct BulletPointsPrompt {
    /// The user-visible message.
    pub message: String,
    /// Exact number of bullet points required.
    pub amount: Option<usize>,
    /// Maximum characters per bullet point.
    pub length: Option<usize>,
    /// Corrective re-prompt budget.
    pub prompt_retries: Option<u32>,
}

impl BulletPointsPrompt {
    /// Creates an unconstrained bullet-point prompt.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            amount: None,
            length: None,
            prompt_retries: None,
        }
    }

    /// Requires exactly `amount` bullet points.
    pub fn with_amount(mut self, amount: usize) -> Self {
        self.amount = Some(amount);
        self
    }

    /// Limits each bullet point to `length` characters.
    pub fn with_length(mut self, length: usize) -> Self {
        self.length = Some(length);
        self
    }

    /// Sets the corrective re-prompt budget.
    pub fn with_retries(mut self, retries: u32) -> Self {
        self.prompt_retries = Some(retries);
        self
    }
}

/// Builds a prompt that demands a bullet-point list and parses it into a
/// `Vec<String>` meeting the configured constraints.
pub fn bullet_points(prompt: BulletPointsPrompt) -> RawPrompt<Vec<String>> {
    let mut schema = StringArraySchema::new();
    let mut format_messages = vec![FORMAT_PROMPT.to_string()];

    if let Some(length) = prompt.length {
        schema = schema.with_max_item_length(
            length,
            format!(
                "Each bullet point should be less than {length} characters, including white spaces."
            ),
        );
        format_messages.push(format!(
            "Each bullet point should be less than {length} characters long, including white spaces."
        ));
    }
    if let Some(amount) = prompt.amount {
        schema = schema.with_exact_length(
            amount,
            format!("There should be exactly {amount} bullet points, no more or less."),
        );
        format_messages.push(format!(
            "There should be exactly {amount} bullet points, no more or less."
        ));
    }

    let message = format!("{}\n\n{}", format_messages.join(" "), prompt.message);
    let mut raw = json(JsonPrompt::new(message, schema).with_parse_response(|response| {
        Value::Array(
            extract_bullet_points(response)
                .into_iter()
                .map(Value::String)
                .collect(),
        )
    }));
    raw.prompt_retries = prompt.prompt_retries;
    raw
}
