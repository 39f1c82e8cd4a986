//! Harvester Core Library
//!
//! Declarative extraction of typed values from semi-structured text (HTML,
//! plain text, anything regular expressions can delimit). A caller declares a
//! [`Schema`] of named [`FieldSpec`]s; the [`Harvester`] acquires a Document's
//! content (literal or fetched), then evaluates every field in dependency
//! order, fetching nested Documents and downloading resources on the way.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`field`] - Field specifications, base extraction and typed coercion
//! - [`schema`] - Per-type field registries and JSON definition files
//! - [`resolver`] - Dependency-ordered resolution
//! - [`document`] - Documents, request configuration and the harvesting engine
//! - [`source`] - Content source boundary and its `reqwest` implementation
//! - [`decode`] - Byte-to-text decoding
//! - [`cache`] - Injected, bounded resource cache
//! - [`address`] - Address detection and joining
//! - [`resource`] - Downloaded-file naming and persistence

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod address;
pub mod cache;
pub mod decode;
pub mod document;
pub mod field;
pub mod resolver;
pub mod resource;
pub mod schema;
pub mod source;
pub mod user_agent;

// Re-export commonly used types
pub use cache::{MemoryCache, ResourceCache};
pub use decode::{DecodeError, Decoder, DecodingStrategy};
pub use document::{Document, DocumentState, HarvestError, Harvester, RequestConfig, Source};
pub use field::{FieldError, FieldKind, FieldSpec, FieldValue};
pub use resolver::GraphError;
pub use schema::{Schema, SchemaDef, SchemaError};
pub use source::{ContentSource, FetchError, FetchRequest, FetchResponse, HttpSource, RequestBody};
