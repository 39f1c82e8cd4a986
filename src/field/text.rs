//! Markup cleanup helpers shared by text fields and named transforms.

use std::sync::LazyLock;

use regex::Regex;

#[allow(clippy::expect_used)]
static TAG_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<[^<]+>").expect("tag regex is valid") // Static pattern, safe to panic
});

#[allow(clippy::expect_used)]
static NUMERIC_ENTITY_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"&#(?:[xX]([0-9a-fA-F]{1,6})|([0-9]{1,7}));")
        .expect("numeric entity regex is valid") // Static pattern, safe to panic
});

/// Replaces every `<...>` tag with a single space.
///
/// ```
/// use harvester_core::field::strip_tags;
///
/// assert_eq!(strip_tags("<b>bold</b>text"), " bold text");
/// ```
#[must_use]
pub fn strip_tags(value: &str) -> String {
    TAG_PATTERN.replace_all(value, " ").into_owned()
}

/// Decodes the common named HTML entities and numeric character references.
///
/// `&amp;` is decoded last so `&amp;lt;` becomes `&lt;`, not `<`.
#[must_use]
pub fn decode_html(value: &str) -> String {
    if !value.contains('&') {
        return value.to_string();
    }
    let named = value
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&nbsp;", "\u{a0}");
    let numeric = NUMERIC_ENTITY_PATTERN.replace_all(&named, |caps: &regex::Captures<'_>| {
        let code = match (caps.get(1), caps.get(2)) {
            (Some(hex), _) => u32::from_str_radix(hex.as_str(), 16).ok(),
            (None, Some(dec)) => dec.as_str().parse::<u32>().ok(),
            (None, None) => None,
        };
        code.and_then(char::from_u32)
            .map_or_else(|| caps[0].to_string(), String::from)
    });
    numeric.replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_tags_replaces_each_tag_with_space() {
        assert_eq!(strip_tags("<p>Hello <em>world</em></p>"), " Hello  world  ");
        assert_eq!(strip_tags("no markup"), "no markup");
    }

    #[test]
    fn test_decode_html_named_entities() {
        assert_eq!(
            decode_html("Fish &amp; Chips &lt;3 &quot;tasty&quot; it&#39;s"),
            "Fish & Chips <3 \"tasty\" it's"
        );
    }

    #[test]
    fn test_decode_html_numeric_entities() {
        assert_eq!(decode_html("caf&#233; &#x263A;"), "café ☺");
    }

    #[test]
    fn test_decode_html_does_not_double_decode() {
        assert_eq!(decode_html("&amp;lt;"), "&lt;");
    }

    #[test]
    fn test_decode_html_keeps_invalid_references() {
        assert_eq!(decode_html("&#xD800;"), "&#xD800;");
        assert_eq!(decode_html("plain"), "plain");
    }
}
