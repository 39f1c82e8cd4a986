//! Base extraction: compiling delimiter pairs and scanning text for bodies.

use regex::{Regex, RegexBuilder};

use super::{FieldError, FieldKind, FieldSpec, LineMode, Multiplicity};

/// Capture group holding the body between the delimiters.
const BODY_GROUP: &str = "harvester_body";

/// Compiles the pattern of a field.
///
/// Delimiter fields compile to `(?:lower)(?P<body>.*?)(?:upper)` with `^`/`$`
/// matching at line boundaries. Presence fields compile their pattern as-is,
/// where `^`/`$` anchor the whole text. In both, `.` crosses newlines only in
/// [`LineMode::Spanning`].
///
/// # Errors
///
/// Returns [`FieldError::Pattern`] if the resulting expression is invalid.
pub(crate) fn compile(name: &str, spec: &FieldSpec) -> Result<Regex, FieldError> {
    let (source, multi_line) = match spec.kind() {
        FieldKind::Presence { pattern } => (pattern.clone(), false),
        _ => (
            format!(
                "(?:{})(?P<{BODY_GROUP}>.*?)(?:{})",
                spec.lower(),
                spec.upper()
            ),
            true,
        ),
    };
    RegexBuilder::new(&source)
        .multi_line(multi_line)
        .dot_matches_new_line(spec.get_line_mode() == LineMode::Spanning)
        .build()
        .map_err(|e| FieldError::pattern(name, e))
}

/// Returns the bodies matched by `regex` in document order.
///
/// [`Multiplicity::Single`] yields at most one body.
pub(crate) fn bodies<'t>(regex: &Regex, text: &'t str, multiplicity: Multiplicity) -> Vec<&'t str> {
    let body = |caps: regex::Captures<'t>| caps.name(BODY_GROUP).map(|m| m.as_str());
    match multiplicity {
        Multiplicity::Single => regex.captures(text).and_then(body).into_iter().collect(),
        Multiplicity::All => regex.captures_iter(text).filter_map(body).collect(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn compiled(spec: &FieldSpec) -> Regex {
        compile("test", spec).unwrap()
    }

    #[test]
    fn test_single_takes_first_body() {
        let spec = FieldSpec::text("<b>", "</b>");
        let text = "<b>one</b> and <b>two</b>";
        assert_eq!(bodies(&compiled(&spec), text, Multiplicity::Single), ["one"]);
    }

    #[test]
    fn test_all_takes_every_body_in_order() {
        let spec = FieldSpec::text("<li>", "</li>").all();
        let text = "<ul><li>a</li><li>b</li><li>c</li></ul>";
        assert_eq!(
            bodies(&compiled(&spec), text, Multiplicity::All),
            ["a", "b", "c"]
        );
    }

    #[test]
    fn test_non_greedy_body() {
        let spec = FieldSpec::text("\\(", "\\)");
        assert_eq!(
            bodies(&compiled(&spec), "(x) (y)", Multiplicity::Single),
            ["x"]
        );
    }

    #[test]
    fn test_no_match_is_empty() {
        let spec = FieldSpec::text("<b>", "</b>");
        assert!(bodies(&compiled(&spec), "nothing here", Multiplicity::Single).is_empty());
        assert!(bodies(&compiled(&spec), "nothing here", Multiplicity::All).is_empty());
    }

    #[test]
    fn test_line_mode_controls_newline_crossing() {
        let text = "<p>first\nsecond</p>";

        let bounded = FieldSpec::text("<p>", "</p>");
        assert!(bodies(&compiled(&bounded), text, Multiplicity::Single).is_empty());

        let spanning = FieldSpec::text("<p>", "</p>").spanning_lines();
        assert_eq!(
            bodies(&compiled(&spanning), text, Multiplicity::Single),
            ["first\nsecond"]
        );
    }

    #[test]
    fn test_anchors_match_at_line_boundaries() {
        let spec = FieldSpec::text("^Name: ", "$").all();
        let text = "Name: Ada\nAge: 36\nName: Grace";
        assert_eq!(
            bodies(&compiled(&spec), text, Multiplicity::All),
            ["Ada", "Grace"]
        );
    }

    #[test]
    fn test_alternation_in_delimiters_is_grouped() {
        let spec = FieldSpec::text("<b>|<strong>", "</b>|</strong>").all();
        let text = "<strong>x</strong><b>y</b>";
        assert_eq!(
            bodies(&compiled(&spec), text, Multiplicity::All),
            ["x", "y"]
        );
    }

    #[test]
    fn test_user_capture_groups_do_not_shift_body() {
        let spec = FieldSpec::text("(id)=", "(;)");
        assert_eq!(
            bodies(&compiled(&spec), "id=42;", Multiplicity::Single),
            ["42"]
        );
    }

    #[test]
    fn test_invalid_pattern_is_reported() {
        let spec = FieldSpec::text("(unclosed", "x");
        let err = compile("broken", &spec).unwrap_err();
        assert!(matches!(err, FieldError::Pattern { ref field, .. } if field == "broken"));
    }

    #[test]
    fn test_presence_compiles_pattern_verbatim() {
        let spec = FieldSpec::presence("in stock");
        let regex = compiled(&spec);
        assert!(regex.is_match("Item is in stock today"));
        assert!(!regex.is_match("Item is sold out"));
    }

    #[test]
    fn test_presence_anchors_apply_to_whole_text() {
        let regex = compiled(&FieldSpec::presence("^Status: open$"));
        assert!(regex.is_match("Status: open"));
        assert!(!regex.is_match("Title\nStatus: open\nFooter"));

        let inline = compiled(&FieldSpec::presence("(?m)^Status: open$"));
        assert!(inline.is_match("Title\nStatus: open\nFooter"));
    }
}
