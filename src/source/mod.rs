//! Content source boundary: everything the engine needs from a transport.
//!
//! The extraction core never talks to the network directly. It builds a
//! [`FetchRequest`] and hands it to a [`ContentSource`]; the bundled
//! [`HttpSource`] implements the trait on top of `reqwest`.
//!
//! # Example
//!
//! ```no_run
//! use harvester_core::source::{ContentSource, FetchRequest, HttpSource};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let source = HttpSource::new();
//! let response = source.fetch(FetchRequest::get("https://example.com/")).await?;
//! println!("{} bytes", response.body.len());
//! # Ok(())
//! # }
//! ```

mod error;
mod http;

pub use error::FetchError;
pub use http::HttpSource;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::cookie::Jar;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Body sent with a POST request.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    /// `application/x-www-form-urlencoded` key/value pairs.
    Form(Vec<(String, String)>),
    /// JSON document.
    Json(serde_json::Value),
}

impl RequestBody {
    /// Encodes the body, returning the bytes and the matching content type.
    #[must_use]
    pub fn encode(&self) -> (Vec<u8>, &'static str) {
        match self {
            Self::Form(pairs) => {
                let encoded = url::form_urlencoded::Serializer::new(String::new())
                    .extend_pairs(pairs.iter().map(|(k, v)| (k.as_str(), v.as_str())))
                    .finish();
                (encoded.into_bytes(), "application/x-www-form-urlencoded")
            }
            Self::Json(value) => (value.to_string().into_bytes(), "application/json"),
        }
    }
}

/// Everything a content source needs to perform one fetch.
#[derive(Debug, Clone)]
pub struct FetchRequest {
    /// Address to fetch.
    pub url: String,
    /// Optional POST body. `None` issues a GET.
    pub body: Option<RequestBody>,
    /// Request headers.
    pub headers: HeaderMap,
    /// Proxy to route through (used for both http and https).
    pub proxy: Option<String>,
    /// Session cookie store, updated in place by the transport.
    pub cookies: Option<Arc<Jar>>,
    /// Whole-request timeout.
    pub timeout: Duration,
}

impl FetchRequest {
    /// Creates a plain GET request with default timeout and no headers.
    #[must_use]
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            body: None,
            headers: HeaderMap::new(),
            proxy: None,
            cookies: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// Raw result of a fetch.
#[derive(Debug, Clone, Default)]
pub struct FetchResponse {
    /// Response body bytes, undecoded.
    pub body: Vec<u8>,
    /// Response headers.
    pub headers: HeaderMap,
    /// The cookie store after the exchange.
    pub cookies: Option<Arc<Jar>>,
}

impl FetchResponse {
    /// Creates a response with the given body and no headers.
    #[must_use]
    pub fn new(body: impl Into<Vec<u8>>) -> Self {
        Self {
            body: body.into(),
            headers: HeaderMap::new(),
            cookies: None,
        }
    }

    /// Adds a header; invalid names or values are ignored.
    #[must_use]
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            self.headers.insert(name, value);
        }
        self
    }

    /// Returns the `Content-Type` header, if present and readable.
    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok())
    }

    /// Returns the `charset` parameter of the `Content-Type` header.
    #[must_use]
    pub fn charset(&self) -> Option<String> {
        self.content_type().and_then(charset_from_content_type)
    }
}

/// Extracts the `charset` parameter from a `Content-Type` value.
pub(crate) fn charset_from_content_type(content_type: &str) -> Option<String> {
    content_type.split(';').skip(1).find_map(|param| {
        let (key, value) = param.split_once('=')?;
        key.trim()
            .eq_ignore_ascii_case("charset")
            .then(|| value.trim().trim_matches('"').to_string())
            .filter(|v| !v.is_empty())
    })
}

/// Transport collaborator used by the engine to retrieve raw content.
///
/// Implementations must surface unreachable hosts, non-success statuses and
/// malformed addresses as distinct [`FetchError`] variants and must not retry.
///
/// # Object Safety
///
/// This trait uses `async_trait` so it can be shared as `Arc<dyn ContentSource>`.
#[async_trait]
pub trait ContentSource: Send + Sync {
    /// Fetches the raw bytes behind `request.url`.
    async fn fetch(&self, request: FetchRequest) -> Result<FetchResponse, FetchError>;
}
