//! Variant coercions that need nothing but the transformed span.

use super::text::{decode_html, strip_tags};
use super::{MalformedNumber, TextOptions};

/// Parses an integer after removing every `thousands_marks` character.
///
/// Returns `None` for empty or unparsable input.
///
/// ```
/// use harvester_core::field::parse_integer;
///
/// assert_eq!(parse_integer("1.234.567", &['.', ',']), Some(1_234_567));
/// assert_eq!(parse_integer("n/a", &['.', ',']), None);
/// ```
#[must_use]
pub fn parse_integer(value: &str, thousands_marks: &[char]) -> Option<i64> {
    let cleaned: String = value
        .chars()
        .filter(|c| !thousands_marks.contains(c))
        .collect();
    cleaned.trim().parse().ok()
}

/// Parses a floating-point number with the given decimal mark.
///
/// Both `.` and `,` are treated as thousands separators except for the
/// decimal mark itself. Returns `Ok(None)` if nothing is left to parse.
///
/// # Errors
///
/// Returns [`MalformedNumber`] when the decimal mark appears more than once
/// or the remaining text is not a finite number.
pub fn parse_float(value: &str, decimal_mark: char) -> Result<Option<f64>, MalformedNumber> {
    if value.matches(decimal_mark).count() > 1 {
        return Err(MalformedNumber::new(
            value,
            "decimal mark appears more than once",
        ));
    }

    let (integral, fractional) = match value.split_once(decimal_mark) {
        Some((integral, fractional)) => (integral, Some(fractional)),
        None => (value, None),
    };
    let mut cleaned: String = integral.chars().filter(|c| !matches!(c, '.' | ',')).collect();
    if let Some(fractional) = fractional {
        cleaned.push('.');
        cleaned.extend(fractional.chars().filter(|c| !matches!(c, '.' | ',')));
    }

    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        return Ok(None);
    }
    match cleaned.parse::<f64>() {
        Ok(number) if number.is_finite() => Ok(Some(number)),
        _ => Err(MalformedNumber::new(value, "not a number")),
    }
}

/// Builds the value of a text field.
///
/// Order: trim, prefix, suffix, tag stripping, entity decoding. `lookup`
/// returns the text of an already-resolved sibling; a missing or empty
/// sibling adds nothing.
#[must_use]
pub fn text_value<F>(value: String, options: &TextOptions, lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    let mut value = if options.trim {
        value.trim().to_string()
    } else {
        value
    };

    let sibling = |name: &Option<String>| {
        name.as_deref()
            .and_then(&lookup)
            .filter(|text| !text.is_empty())
    };
    if let Some(prefix) = sibling(&options.prefix) {
        value.insert_str(0, &prefix);
    }
    if let Some(suffix) = sibling(&options.suffix) {
        value.push_str(&suffix);
    }

    if options.strip_tags {
        value = strip_tags(&value);
    }
    if options.decode_html {
        value = decode_html(&value);
    }
    value
}
