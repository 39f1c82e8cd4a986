//! Field-level error types.

use thiserror::Error;

/// A captured span that cannot be read as a number.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("malformed number '{value}': {reason}")]
pub struct MalformedNumber {
    /// The offending value, after transforms.
    pub value: String,
    /// What was wrong with it.
    pub reason: &'static str,
}

impl MalformedNumber {
    pub(crate) fn new(value: &str, reason: &'static str) -> Self {
        Self {
            value: value.to_string(),
            reason,
        }
    }
}

/// Errors raised while compiling or evaluating a single field.
#[derive(Debug, Error)]
pub enum FieldError {
    /// The lower/upper (or presence) pattern is not a valid regular expression.
    #[error("invalid pattern for field '{field}': {source}")]
    Pattern {
        /// Field name.
        field: String,
        /// Underlying regex error.
        #[source]
        source: Box<regex::Error>,
    },

    /// Coercion to a number failed.
    #[error("field '{field}': {source}")]
    Coercion {
        /// Field name.
        field: String,
        /// Why the value was rejected.
        #[source]
        source: MalformedNumber,
    },

    /// A schema definition names a transform that does not exist.
    #[error("unknown transform '{0}'")]
    UnknownTransform(String),
}

impl FieldError {
    /// Creates a pattern error.
    #[must_use]
    pub fn pattern(field: impl Into<String>, source: regex::Error) -> Self {
        Self::Pattern {
            field: field.into(),
            source: Box::new(source),
        }
    }

    /// Creates a coercion error.
    #[must_use]
    pub fn coercion(field: impl Into<String>, source: MalformedNumber) -> Self {
        Self::Coercion {
            field: field.into(),
            source,
        }
    }
}
