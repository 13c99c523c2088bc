//! Schema implementations shipped with the crate.

use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::ports::schema::{Issue, Schema};

/// Validates an array of strings with optional per-item length and exact
/// item-count constraints. Violation messages are configurable because they
/// are fed back to the model verbatim.
#[derive(Debug, Clone, Default)]
pub struct StringArraySchema {
    max_item_length: Option<(usize, String)>,
    exact_length: Option<(usize, String)>,
}

impl StringArraySchema {
    /// Creates an unconstrained string-array schema.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requires every item to be at most `max` characters, reporting `message`
    /// on violation.
    pub fn with_max_item_length(mut self, max: usize, message: impl Into<String>) -> Self {
        self.max_item_length = Some((max, message.into()));
        self
    }

    /// Requires exactly `len` items, reporting `message` on violation.
    pub fn with_exact_length(mut self, len: usize, message: impl Into<String>) -> Self {
        self.exact_length = Some((len, message.into()));
        self
    }
}

impl Schema<Vec<String>> for StringArraySchema {
    fn safe_parse(&self, value: &Value) -> Result<Vec<String>, Vec<Issue>> {
        let Some(items) = value.as_array() else {
            return Err(vec![Issue::new("Expected a JSON array of strings.")]);
        };

        let mut parsed = Vec::with_capacity(items.len());
        let mut issues = Vec::new();

        for (index, item) in items.iter().enumerate() {
            match item.as_str() {
                Some(text) => {
                    if let Some((max, message)) = &self.max_item_length {
                        if text.chars().count() > *max {
                            issues.push(Issue::at_index(index, message.clone()));
                        }
                    }
                    parsed.push(text.to_string());
                }
                None => issues.push(Issue::at_index(index, "Expected a string.")),
            }
        }

        if let Some((expected, message)) = &self.exact_length {
            if items.len() != *expected {
                issues.push(Issue::new(message.clone()));
            }
        }

        if issues.is_empty() {
            Ok(parsed)
        } else {
            Err(issues)
        }
    }
}

/// Validates by deserializing into `T` with serde.
///
/// Serde's error carries no structured field path, so violations surface as a
/// single pathless issue with serde's message.
pub struct TypedSchema<T> {
    _payload: PhantomData<fn() -> T>,
}

impl<T> TypedSchema<T> {
    /// Creates a typed schema for `T`.
    pub fn new() -> Self {
        Self {
            _payload: PhantomData,
        }
    }
}

impl<T> Default for TypedSchema<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for TypedSchema<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypedSchema").finish()
    }
}

impl<T: DeserializeOwned> Schema<T> for TypedSchema<T> {
    fn safe_parse(&self, value: &Value) -> Result<T, Vec<Issue>> {
        serde_json::from_value(value.clone()).map_err(|err| vec![Issue::new(err.to_string())])
    }
}
