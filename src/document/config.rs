//! Per-Document request configuration.

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use rand::seq::SliceRandom;
use reqwest::cookie::Jar;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, USER_AGENT};

use crate::decode::DecodingStrategy;
use crate::source::DEFAULT_TIMEOUT;
use crate::user_agent;

/// Upper bound of the random extra wait added to `wait_about`.
const WAIT_JITTER_SECS: f64 = 1.5;

/// Request settings of a Document, inherited verbatim by nested Documents.
#[derive(Debug, Clone)]
pub struct RequestConfig {
    /// Headers sent with every request.
    pub headers: HeaderMap,
    /// Session cookie store shared with nested Documents.
    pub cookies: Option<Arc<Jar>>,
    /// Proxies; one is picked at random per request.
    pub proxies: Vec<String>,
    /// Send a random browser User-Agent instead of the tool's own.
    pub disguise: bool,
    /// Baseline of the randomized wait before each network fetch.
    pub wait_about: Option<Duration>,
    /// Read and write the engine's resource cache.
    pub use_cache: bool,
    /// How fetched bytes are decoded.
    pub decoding: DecodingStrategy,
    /// Whole-request timeout enforced by the content source.
    pub timeout: Duration,
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            headers: HeaderMap::new(),
            cookies: None,
            proxies: Vec::new(),
            disguise: false,
            wait_about: None,
            use_cache: false,
            decoding: DecodingStrategy::default(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl RequestConfig {
    /// Adds a header.
    #[must_use]
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Sets the proxy list.
    #[must_use]
    pub fn proxies<I, S>(mut self, proxies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.proxies = proxies.into_iter().map(Into::into).collect();
        self
    }

    /// Enables or disables disguise.
    #[must_use]
    pub fn disguise(mut self, disguise: bool) -> Self {
        self.disguise = disguise;
        self
    }

    /// Sets the wait baseline.
    #[must_use]
    pub fn wait_about(mut self, baseline: Duration) -> Self {
        self.wait_about = Some(baseline);
        self
    }

    /// Opts into the resource cache.
    #[must_use]
    pub fn use_cache(mut self, use_cache: bool) -> Self {
        self.use_cache = use_cache;
        self
    }

    /// Sets the decoding strategy.
    #[must_use]
    pub fn decoding(mut self, decoding: DecodingStrategy) -> Self {
        self.decoding = decoding;
        self
    }

    /// Shares a cookie store.
    #[must_use]
    pub fn cookies(mut self, jar: Arc<Jar>) -> Self {
        self.cookies = Some(jar);
        self
    }

    /// Sets the request timeout.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Picks a random proxy, if any are configured.
    #[must_use]
    pub fn pick_proxy(&self) -> Option<&str> {
        self.proxies
            .choose(&mut rand::thread_rng())
            .map(String::as_str)
    }

    /// Draws the wait before a network fetch: uniform in
    /// `[wait_about, wait_about + 1.5s]`. `None` when no (or a zero) baseline is set.
    #[must_use]
    pub fn prefetch_delay(&self) -> Option<Duration> {
        let baseline = self.wait_about.filter(|d| !d.is_zero())?;
        let jitter = rand::thread_rng().gen_range(0.0..=WAIT_JITTER_SECS);
        Some(baseline + Duration::from_secs_f64(jitter))
    }

    /// Headers for one outgoing request, with the User-Agent filled in
    /// unless the caller supplied one.
    #[must_use]
    pub fn request_headers(&self) -> HeaderMap {
        let mut headers = self.headers.clone();
        if !headers.contains_key(USER_AGENT) {
            if let Ok(value) = HeaderValue::from_str(&user_agent::user_agent_for(self.disguise)) {
                headers.insert(USER_AGENT, value);
            }
        }
        headers
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RequestConfig::default();
        assert_eq!(config.timeout, Duration::from_secs(10));
        assert!(!config.disguise);
        assert!(!config.use_cache);
        assert!(config.pick_proxy().is_none());
        assert!(config.prefetch_delay().is_none());
    }

    #[test]
    fn test_prefetch_delay_range() {
        let config = RequestConfig::default().wait_about(Duration::from_secs(2));
        for _ in 0..50 {
            let delay = config.prefetch_delay().unwrap();
            assert!(delay >= Duration::from_secs(2), "{delay:?}");
            assert!(delay <= Duration::from_millis(3500), "{delay:?}");
        }
    }

    #[test]
    fn test_zero_wait_means_no_delay() {
        let config = RequestConfig::default().wait_about(Duration::ZERO);
        assert!(config.prefetch_delay().is_none());
    }

    #[test]
    fn test_pick_proxy_from_list() {
        let config = RequestConfig::default().proxies(["http://p1.test:8080", "http://p2.test:8080"]);
        for _ in 0..20 {
            let proxy = config.pick_proxy().unwrap();
            assert!(config.proxies.iter().any(|p| p == proxy));
        }
    }

    #[test]
    fn test_request_headers_identify_tool() {
        let headers = RequestConfig::default().request_headers();
        let ua = headers.get(USER_AGENT).unwrap().to_str().unwrap();
        assert!(ua.starts_with("harvester/"), "{ua}");
    }

    #[test]
    fn test_request_headers_disguised() {
        let headers = RequestConfig::default().disguise(true).request_headers();
        let ua = headers.get(USER_AGENT).unwrap().to_str().unwrap();
        assert!(ua.starts_with("Mozilla/5.0"), "{ua}");
    }

    #[test]
    fn test_caller_user_agent_wins() {
        let headers = RequestConfig::default()
            .disguise(true)
            .header(USER_AGENT, HeaderValue::from_static("Custom/1.0"))
            .request_headers();
        assert_eq!(headers.get(USER_AGENT).unwrap(), "Custom/1.0");
    }
}
