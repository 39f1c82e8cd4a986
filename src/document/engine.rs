//! The harvesting engine.
//!
//! [`Harvester`] owns the collaborators (content source, decoder, optional
//! resource cache) and drives a Document through its lifecycle:
//!
//! 1. Acquire content: literal text as-is, or fetch (after the optional
//!    randomized wait) and decode, reading and writing the cache when asked.
//! 2. Resolve: walk the fields in dependency order, evaluating each one as
//!    soon as it becomes eligible, exactly once.
//!
//! Everything is awaited sequentially: one field at a time, and a nested
//! Document is fully harvested before its parent moves on. Callers wanting
//! parallelism harvest independent Documents concurrently; a shared cache is
//! then serialized per address.

use std::fmt;
use std::sync::Arc;

use futures_util::future::BoxFuture;
use reqwest::cookie::Jar;
use reqwest::header::HeaderMap;
use tracing::{debug, info, instrument};

use super::{Document, DocumentState, HarvestError, RequestConfig, Source};
use crate::cache::{AddressLocks, ResourceCache};
use crate::decode::Decoder;
use crate::resolver::Resolver;
use crate::schema::Schema;
use crate::source::{ContentSource, FetchError, FetchRequest, FetchResponse, HttpSource, RequestBody};

/// Content acquired for an address.
struct Loaded {
    content: String,
    headers: Option<HeaderMap>,
    cookies: Option<Arc<Jar>>,
}

/// Builds fully resolved Documents.
pub struct Harvester {
    source: Arc<dyn ContentSource>,
    decoder: Decoder,
    cache: Option<Arc<dyn ResourceCache>>,
    locks: AddressLocks,
}

impl fmt::Debug for Harvester {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Harvester")
            .field("decoder", &self.decoder)
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}

impl Harvester {
    /// Creates an engine on top of `source`, without a cache.
    #[must_use]
    pub fn new(source: Arc<dyn ContentSource>) -> Self {
        Self {
            source,
            decoder: Decoder::default(),
            cache: None,
            locks: AddressLocks::new(),
        }
    }

    /// Creates an engine backed by [`HttpSource`].
    #[must_use]
    pub fn http() -> Self {
        Self::new(Arc::new(HttpSource::new()))
    }

    /// Injects the resource cache used by Documents that opt in.
    #[must_use]
    pub fn with_cache(mut self, cache: Arc<dyn ResourceCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Replaces the decoder.
    #[must_use]
    pub fn with_decoder(mut self, decoder: Decoder) -> Self {
        self.decoder = decoder;
        self
    }

    /// Acquires content from `source` and resolves every field of `schema`.
    ///
    /// # Errors
    ///
    /// Returns [`HarvestError`] if the content cannot be acquired, the
    /// dependency graph is invalid, or any field fails. No partially resolved
    /// Document is ever returned.
    pub async fn harvest(
        &self,
        schema: &Arc<Schema>,
        source: Source,
        config: RequestConfig,
    ) -> Result<Document, HarvestError> {
        self.harvest_boxed(Arc::clone(schema), source, config).await
    }

    /// Boxed so nested fields can recurse into it.
    pub(crate) fn harvest_boxed(
        &self,
        schema: Arc<Schema>,
        source: Source,
        config: RequestConfig,
    ) -> BoxFuture<'_, Result<Document, HarvestError>> {
        Box::pin(async move {
            let mut document = self.acquire(schema, source, config).await?;
            self.resolve(&mut document).await?;
            Ok(document)
        })
    }

    async fn acquire(
        &self,
        schema: Arc<Schema>,
        source: Source,
        mut config: RequestConfig,
    ) -> Result<Document, HarvestError> {
        match source {
            Source::Content { text, base } => {
                debug!(schema = schema.name(), bytes = text.len(), "literal content");
                Ok(Document::acquired(schema, text, base, config, None))
            }
            Source::Address { url, body } => {
                let loaded = self.load(&url, body, &config).await?;
                if loaded.cookies.is_some() {
                    config.cookies = loaded.cookies;
                }
                Ok(Document::acquired(
                    schema,
                    loaded.content,
                    Some(url),
                    config,
                    loaded.headers,
                ))
            }
        }
    }

    /// Reads through the cache when the Document opted in and one is injected.
    ///
    /// POST requests bypass the cache, which is keyed by address only.
    async fn load(
        &self,
        url: &str,
        body: Option<RequestBody>,
        config: &RequestConfig,
    ) -> Result<Loaded, HarvestError> {
        let cache = match (&self.cache, config.use_cache && body.is_none()) {
            (Some(cache), true) => cache,
            (None, true) => {
                debug!(url, "cache requested but none configured");
                return self.download(url, None, config).await;
            }
            (_, false) => return self.download(url, body, config).await,
        };

        let _guard = self.locks.acquire(url).await;
        if let Some(content) = cache.get(url) {
            debug!(url, "content served from cache");
            return Ok(Loaded {
                content,
                headers: None,
                cookies: None,
            });
        }
        let loaded = self.download(url, None, config).await?;
        cache.put(url, loaded.content.clone());
        Ok(loaded)
    }

    #[instrument(skip(self, body, config), fields(post = body.is_some()))]
    async fn download(
        &self,
        url: &str,
        body: Option<RequestBody>,
        config: &RequestConfig,
    ) -> Result<Loaded, HarvestError> {
        if let Some(delay) = config.prefetch_delay() {
            debug!(?delay, "waiting before fetch");
            tokio::time::sleep(delay).await;
        }

        let response = self.fetch(url, body, config).await?;

        let mut labels: Vec<String> = response.charset().into_iter().collect();
        labels.extend(config.decoding.preferred.iter().cloned());
        let content =
            self.decoder
                .decode(&response.body, &labels, config.decoding.deep_discovery)?;
        info!(bytes = response.body.len(), chars = content.len(), "content acquired");

        Ok(Loaded {
            content,
            headers: Some(response.headers),
            cookies: response.cookies,
        })
    }

    /// Sends one request with the Document's headers, identity, a random
    /// proxy, its cookies and timeout.
    pub(crate) async fn fetch(
        &self,
        url: &str,
        body: Option<RequestBody>,
        config: &RequestConfig,
    ) -> Result<FetchResponse, FetchError> {
        let request = FetchRequest {
            url: url.to_string(),
            body,
            headers: config.request_headers(),
            proxy: config.pick_proxy().map(str::to_string),
            cookies: config.cookies.clone(),
            timeout: config.timeout,
        };
        self.source.fetch(request).await
    }

    /// Evaluates every field in dependency order. Does nothing on a Document
    /// that is already resolved.
    async fn resolve(&self, document: &mut Document) -> Result<(), HarvestError> {
        if document.state == DocumentState::Resolved {
            return Ok(());
        }
        document.state = DocumentState::Resolving;

        let schema = Arc::clone(&document.schema);
        let resolver = Resolver::new(schema.fields().map(|field| {
            (
                field.name(),
                field.spec().dependencies().iter().map(String::as_str),
            )
        }))?;

        for name in resolver {
            let name = name?;
            let Some(field) = schema.field(name) else {
                continue;
            };
            let value = self.evaluate(document, field).await?;
            document.fields.insert(name.to_string(), value);
        }

        document.state = DocumentState::Resolved;
        debug!(schema = schema.name(), fields = document.fields.len(), "document resolved");
        Ok(())
    }
}
