//! Schema construction errors.

use std::path::PathBuf;

use thiserror::Error;

use crate::field::FieldError;

/// Errors raised while building a [`Schema`](super::Schema).
#[derive(Debug, Error)]
pub enum SchemaError {
    /// The same field name was declared twice in one schema.
    #[error("field '{0}' is declared more than once")]
    DuplicateField(String),

    /// A field lists itself as a dependency.
    #[error("field '{0}' depends on itself")]
    SelfDependency(String),

    /// A field failed to compile.
    #[error(transparent)]
    Field(#[from] FieldError),

    /// A content window pattern is invalid.
    #[error("invalid {which} pattern: {source}")]
    Window {
        /// `drop_before` or `drop_after`.
        which: &'static str,
        /// Underlying regex error.
        #[source]
        source: Box<regex::Error>,
    },

    /// A schema definition file could not be read.
    #[error("failed to read schema file {path}: {source}")]
    Io {
        /// File path.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// A schema definition file is not valid.
    #[error("invalid schema definition: {0}")]
    Definition(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(
            SchemaError::DuplicateField("title".into()).to_string(),
            "field 'title' is declared more than once"
        );
        assert_eq!(
            SchemaError::SelfDependency("a".into()).to_string(),
            "field 'a' depends on itself"
        );
    }
}
