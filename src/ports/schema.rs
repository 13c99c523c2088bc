//! Schema Port - Structured-output validation interface.
//!
//! The JSON prompt builder validates extracted model output against a schema
//! before accepting it. This port defines the contract; the crate ships two
//! implementations (a constrained string-array schema and a serde-backed
//! typed schema) and callers can bring their own, including plain closures.
//!
//! Validation failures are values, not panics: each [`Issue`] names the path
//! to the offending value and carries a human-readable message that is fed
//! back to the model verbatim on retry, so messages should read as
//! instructions ("Each bullet point should be less than 200 characters").

use serde_json::Value;
use thiserror::Error;

/// Port for validating an extracted JSON value into a typed payload.
pub trait Schema<T>: Send + Sync {
    /// Validate `value`, returning the typed data or the list of violations.
    ///
    /// Implementations must not panic on malformed input; every failure mode
    /// is an [`Issue`].
    fn safe_parse(&self, value: &Value) -> Result<T, Vec<Issue>>;
}

/// Closures can act as schemas directly.
impl<T, F> Schema<T> for F
where
    F: Fn(&Value) -> Result<T, Vec<Issue>> + Send + Sync,
{
    fn safe_parse(&self, value: &Value) -> Result<T, Vec<Issue>> {
        self(value)
    }
}

/// A single validation violation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct Issue {
    /// Path from the root value to the offending field. Empty for failures
    /// that concern the value as a whole.
    pub path: Vec<PathSegment>,
    /// Human-readable description, fed back to the model on retry.
    pub message: String,
}

impl Issue {
    /// Creates an issue with no path (concerns the whole value).
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            path: Vec::new(),
            message: message.into(),
        }
    }

    /// Creates an issue at the given path.
    pub fn at(path: Vec<PathSegment>, message: impl Into<String>) -> Self {
        Self {
            path,
            message: message.into(),
        }
    }

    /// Creates an issue at a single array index.
    pub fn at_index(index: usize, message: impl Into<String>) -> Self {
        Self::at(vec![PathSegment::Index(index)], message)
    }

    /// Creates an issue at a single object key.
    pub fn at_key(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::at(vec![PathSegment::Key(key.into())], message)
    }
}

/// One step in a path from the root value to a field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    /// Object member access by key.
    Key(String),
    /// Array element access by index.
    Index(usize),
}

impl std::fmt::Display for PathSegment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PathSegment::Key(key) => write!(f, "{}", key),
            PathSegment::Index(index) => write!(f, "{}", index),
        }
    }
}
