//! Address detection, normalization and joining.
//!
//! Captured spans are only treated as addresses when they look like a full
//! web/ftp URL; everything else is literal content. Relative spans are
//! resolved against the origin of the Document they were extracted from.

use std::sync::LazyLock;

use regex::{Regex, RegexBuilder};
use tracing::trace;
use url::Url;

use crate::source::FetchError;

/// Pattern for a well-formed absolute address.
///
/// Scheme (http, https, ftp, ftps), then a domain, `localhost`, an IPv4
/// address or a bracketed IPv6 address, an optional port and an optional
/// path/query without whitespace.
#[allow(clippy::expect_used)]
static ADDRESS_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    RegexBuilder::new(
        r"^(?:http|ftp)s?://(?:(?:[A-Z0-9](?:[A-Z0-9-]{0,61}[A-Z0-9])?\.)+(?:[A-Z]{2,6}\.?|[A-Z0-9-]{2,}\.?)|localhost|\d{1,3}\.\d{1,3}\.\d{1,3}\.\d{1,3}|\[?[A-F0-9]*:[A-F0-9:]+\]?)(?::\d+)?(?:/?|[/?]\S+)$",
    )
    .case_insensitive(true)
    .build()
    .expect("address regex is valid") // Static pattern, safe to panic
});

/// Returns true if `value` is a well-formed absolute address.
///
/// # Examples
///
/// ```
/// use harvester_core::address::is_address;
///
/// assert!(is_address("https://example.com/path?query=string"));
/// assert!(!is_address("www.example.com"));
/// ```
#[must_use]
pub fn is_address(value: &str) -> bool {
    ADDRESS_PATTERN.is_match(value)
}

/// Parses and normalizes an address so it can be requested.
///
/// Spaces and non-ASCII characters in path and query are percent-encoded.
///
/// # Errors
///
/// Returns [`FetchError::InvalidUrl`] when the value cannot be parsed or has no host.
pub fn normalize(address: &str) -> Result<Url, FetchError> {
    let parsed = Url::parse(address.trim()).map_err(|_| FetchError::invalid_url(address))?;
    if parsed.host_str().is_none() {
        return Err(FetchError::invalid_url(address));
    }
    trace!(address = %parsed, "normalized address");
    Ok(parsed)
}

/// Returns `scheme://host[:port]` for the given address.
#[must_use]
pub fn base_address(address: &str) -> Option<String> {
    let parsed = Url::parse(address).ok()?;
    let host = parsed.host_str()?;
    Some(match parsed.port() {
        Some(port) => format!("{}://{host}:{port}", parsed.scheme()),
        None => format!("{}://{host}", parsed.scheme()),
    })
}

/// Returns true if the value parses as a URL with a host component.
#[must_use]
pub fn is_absolute(value: &str) -> bool {
    Url::parse(value).is_ok_and(|u| u.host_str().is_some())
}

/// Resolves a captured span to an absolute address.
///
/// - `//host/path` gets the origin's scheme (or `http` without an origin).
/// - Absolute addresses are returned unchanged.
/// - Anything else is joined against `origin`.
///
/// # Errors
///
/// Returns [`FetchError::InvalidUrl`] if the span is relative and there is no
/// usable origin to join it against.
pub fn resolve_against(span: &str, origin: Option<&str>) -> Result<String, FetchError> {
    let span = span.trim();
    if let Some(rest) = span.strip_prefix("//") {
        let scheme = origin
            .and_then(|o| Url::parse(o).ok())
            .map_or_else(|| "http".to_string(), |u| u.scheme().to_string());
        return Ok(format!("{scheme}://{rest}"));
    }

    if is_absolute(span) {
        return Ok(span.to_string());
    }

    let base = origin
        .and_then(|o| Url::parse(o).ok())
        .ok_or_else(|| FetchError::invalid_url(span))?;
    base.join(span)
        .map(String::from)
        .map_err(|_| FetchError::invalid_url(span))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_is_address_accepts_web_and_ftp() {
        assert!(is_address("http://example.com"));
        assert!(is_address("https://example.com/path?query=string"));
        assert!(is_address("ftp://example.com/whatever"));
        assert!(is_address("http://localhost:8080/a"));
        assert!(is_address("http://127.0.0.1:3000/detail"));
        assert!(is_address("HTTP://EXAMPLE.COM/UPPER"));
    }

    #[test]
    fn test_is_address_rejects_non_addresses() {
        assert!(!is_address("not_a_url"));
        assert!(!is_address("www.example.com"));
        assert!(!is_address(""));
        assert!(!is_address("/relative/path"));
        assert!(!is_address("http://example.com/with space"));
    }

    #[test]
    fn test_normalize_percent_encodes_path() {
        let url = normalize("http://example.com/path with spaces?query=1").unwrap();
        assert_eq!(url.as_str(), "http://example.com/path%20with%20spaces?query=1");

        let url = normalize("http://example.com/áéíóú").unwrap();
        assert_eq!(
            url.as_str(),
            "http://example.com/%C3%A1%C3%A9%C3%AD%C3%B3%C3%BA"
        );
    }

    #[test]
    fn test_normalize_rejects_garbage() {
        assert!(matches!(
            normalize("not a url"),
            Err(FetchError::InvalidUrl { .. })
        ));
    }

    #[test]
    fn test_base_address_keeps_port() {
        assert_eq!(
            base_address("http://example.com/a/b?c=d").as_deref(),
            Some("http://example.com")
        );
        assert_eq!(
            base_address("http://127.0.0.1:9000/x").as_deref(),
            Some("http://127.0.0.1:9000")
        );
        assert_eq!(base_address("no address"), None);
    }

    #[test]
    fn test_is_absolute() {
        assert!(is_absolute("http://example.com"));
        assert!(is_absolute("https://example.com/path"));
        assert!(!is_absolute("/some/path"));
        assert!(!is_absolute("images/test.jpg"));
    }

    #[test]
    fn test_resolve_against_protocol_relative_uses_origin_scheme() {
        assert_eq!(
            resolve_against("//cdn.test/img.png", Some("https://site.test/page")).unwrap(),
            "https://cdn.test/img.png"
        );
        assert_eq!(
            resolve_against("//cdn.test/img.png", None).unwrap(),
            "http://cdn.test/img.png"
        );
    }

    #[test]
    fn test_resolve_against_relative_joins_origin() {
        assert_eq!(
            resolve_against("images/photo.png", Some("http://base-url.com")).unwrap(),
            "http://base-url.com/images/photo.png"
        );
        assert_eq!(
            resolve_against(" /files/a.pdf ", Some("http://base-url.com/deep/page.html")).unwrap(),
            "http://base-url.com/files/a.pdf"
        );
    }

    #[test]
    fn test_resolve_against_absolute_is_unchanged() {
        assert_eq!(
            resolve_against("https://example.com/resource", Some("http://other.test")).unwrap(),
            "https://example.com/resource"
        );
    }

    #[test]
    fn test_resolve_against_relative_without_origin_fails() {
        assert!(matches!(
            resolve_against("images/photo.png", None),
            Err(FetchError::InvalidUrl { .. })
        ));
    }
}
