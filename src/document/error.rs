//! Top-level harvest errors.

use thiserror::Error;

use crate::decode::DecodeError;
use crate::field::FieldError;
use crate::resolver::GraphError;
use crate::source::FetchError;

/// Any failure that aborts a Document.
#[derive(Debug, Error)]
pub enum HarvestError {
    /// Neither literal content nor an address was supplied.
    #[error("a document needs either literal content or an address")]
    NoSource,

    /// Both literal content and an address were supplied.
    #[error("a document takes literal content or an address, not both")]
    ConflictingSource,

    /// The dependency graph cannot be resolved.
    #[error(transparent)]
    Graph(#[from] GraphError),

    /// Fetching the Document's own content failed.
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// The fetched bytes could not be decoded.
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// A field failed to evaluate.
    #[error(transparent)]
    Field(#[from] FieldError),

    /// A resource download failed under the propagate policy.
    #[error("resource download for field '{field}' failed: {source}")]
    Resource {
        /// Field name.
        field: String,
        /// Transport failure.
        #[source]
        source: FetchError,
    },

    /// A nested Document failed; the parent fails with it.
    #[error("nested document for field '{field}' failed: {source}")]
    Nested {
        /// Field name on the parent.
        field: String,
        /// The child's failure.
        #[source]
        source: Box<HarvestError>,
    },
}

impl HarvestError {
    /// Wraps a resource download failure.
    #[must_use]
    pub fn resource(field: impl Into<String>, source: FetchError) -> Self {
        Self::Resource {
            field: field.into(),
            source,
        }
    }

    /// Wraps a nested Document failure.
    #[must_use]
    pub fn nested(field: impl Into<String>, source: HarvestError) -> Self {
        Self::Nested {
            field: field.into(),
            source: Box::new(source),
        }
    }

    /// Follows `Nested` wrappers down to the failure that started it.
    #[must_use]
    pub fn root_cause(&self) -> &HarvestError {
        match self {
            Self::Nested { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nested_display_and_root_cause() {
        let inner = HarvestError::Fetch(FetchError::http_status("http://x.test/detail", 404));
        let err = HarvestError::nested("detail", HarvestError::nested("inner", inner));
        assert!(err.to_string().contains("'detail'"));
        assert!(matches!(
            err.root_cause(),
            HarvestError::Fetch(FetchError::HttpStatus { status: 404, .. })
        ));
    }

    #[test]
    fn test_resource_display() {
        let err = HarvestError::resource("manual", FetchError::invalid_url("::"));
        let msg = err.to_string();
        assert!(msg.contains("manual"), "{msg}");
    }
}
