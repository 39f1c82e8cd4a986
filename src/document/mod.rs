//! Documents and the engine that harvests them.
//!
//! A [`Document`] is one unit of raw text (literal or fetched) plus the
//! resolved values of its schema's fields. Documents are only ever handed out
//! by [`Harvester::harvest`], fully resolved; a failure anywhere (including in
//! a nested Document) aborts the whole Document.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use harvester_core::document::{Harvester, RequestConfig, Source};
//! use harvester_core::field::FieldSpec;
//! use harvester_core::schema::Schema;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let schema = Arc::new(
//!     Schema::builder("page")
//!         .field("title", FieldSpec::text("<title>", "</title>").trimmed())
//!         .build()?,
//! );
//! let harvester = Harvester::http();
//! let page = harvester
//!     .harvest(&schema, Source::address("https://example.com/"), RequestConfig::default())
//!     .await?;
//! println!("{:?}", page.get("title"));
//! # Ok(())
//! # }
//! ```

mod config;
mod engine;
mod error;
mod evaluate;

pub use config::RequestConfig;
pub use engine::Harvester;
pub use error::HarvestError;

use std::sync::Arc;

use indexmap::IndexMap;
use reqwest::cookie::Jar;
use reqwest::header::HeaderMap;
use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::address;
use crate::field::FieldValue;
use crate::schema::Schema;
use crate::source::RequestBody;

/// Where a Document's content comes from.
#[derive(Debug, Clone)]
pub enum Source {
    /// Literal text. `base` is the origin relative addresses resolve against.
    Content {
        /// Raw text.
        text: String,
        /// Optional origin.
        base: Option<String>,
    },
    /// Remote content fetched through the content source.
    Address {
        /// Address to fetch.
        url: String,
        /// Optional POST body for this fetch only.
        body: Option<RequestBody>,
    },
}

impl Source {
    /// Literal content without origin.
    #[must_use]
    pub fn content(text: impl Into<String>) -> Self {
        Self::Content {
            text: text.into(),
            base: None,
        }
    }

    /// Literal content with an origin for relative addresses.
    #[must_use]
    pub fn content_with_base(text: impl Into<String>, base: impl Into<String>) -> Self {
        Self::Content {
            text: text.into(),
            base: Some(base.into()),
        }
    }

    /// GET an address.
    #[must_use]
    pub fn address(url: impl Into<String>) -> Self {
        Self::Address {
            url: url.into(),
            body: None,
        }
    }

    /// POST `body` to an address.
    #[must_use]
    pub fn post(url: impl Into<String>, body: RequestBody) -> Self {
        Self::Address {
            url: url.into(),
            body: Some(body),
        }
    }

    /// Builds a source from optional parts; exactly one must be given.
    /// Empty strings count as absent.
    ///
    /// # Errors
    ///
    /// Returns [`HarvestError::NoSource`] or [`HarvestError::ConflictingSource`].
    pub fn from_parts(content: Option<String>, url: Option<String>) -> Result<Self, HarvestError> {
        let content = content.filter(|c| !c.is_empty());
        let url = url.filter(|u| !u.is_empty());
        match (content, url) {
            (Some(text), None) => Ok(Self::content(text)),
            (None, Some(url)) => Ok(Self::address(url)),
            (None, None) => Err(HarvestError::NoSource),
            (Some(_), Some(_)) => Err(HarvestError::ConflictingSource),
        }
    }
}

/// Lifecycle of a Document once its content is acquired.
///
/// The earlier, uninitialized stage is the [`Source`] the Document is built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentState {
    /// Content is available; no field has run.
    ContentAcquired,
    /// Fields are being evaluated.
    Resolving,
    /// Every field has a value. Terminal.
    Resolved,
}

/// Raw text, its context and its resolved field values.
#[derive(Debug, Clone)]
pub struct Document {
    schema: Arc<Schema>,
    content: String,
    origin: Option<String>,
    config: RequestConfig,
    response_headers: Option<HeaderMap>,
    fields: IndexMap<String, FieldValue>,
    state: DocumentState,
}

impl Document {
    pub(crate) fn acquired(
        schema: Arc<Schema>,
        content: String,
        origin: Option<String>,
        config: RequestConfig,
        response_headers: Option<HeaderMap>,
    ) -> Self {
        let capacity = schema.len();
        Self {
            schema,
            content,
            origin,
            config,
            response_headers,
            fields: IndexMap::with_capacity(capacity),
            state: DocumentState::ContentAcquired,
        }
    }

    /// Resolved value of a field, if the schema declares it.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    /// Resolved fields in schema declaration order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.schema
            .fields()
            .filter_map(|f| self.fields.get_key_value(f.name()))
            .map(|(name, value)| (name.as_str(), value))
    }

    /// The schema this Document was resolved with.
    #[must_use]
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Raw decoded content, before the schema's content window is applied.
    #[must_use]
    pub fn content(&self) -> &str {
        &self.content
    }

    /// The part of the content fields are extracted from.
    #[must_use]
    pub fn extraction_text(&self) -> &str {
        self.schema.window(&self.content)
    }

    /// Address the content came from, or the base given with literal content.
    #[must_use]
    pub fn origin(&self) -> Option<&str> {
        self.origin.as_deref()
    }

    /// `scheme://host[:port]` of the origin.
    #[must_use]
    pub fn base_address(&self) -> Option<String> {
        self.origin.as_deref().and_then(address::base_address)
    }

    /// Headers of the response the content came from. Absent for literal or
    /// cache-served content.
    #[must_use]
    pub fn response_headers(&self) -> Option<&HeaderMap> {
        self.response_headers.as_ref()
    }

    /// Session cookie store.
    #[must_use]
    pub fn cookies(&self) -> Option<&Arc<Jar>> {
        self.config.cookies.as_ref()
    }

    /// Request configuration, as inherited by nested Documents.
    #[must_use]
    pub fn config(&self) -> &RequestConfig {
        &self.config
    }

    /// Lifecycle state.
    #[must_use]
    pub fn state(&self) -> DocumentState {
        self.state
    }
}

impl Serialize for Document {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (name, value) in self.fields() {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}
