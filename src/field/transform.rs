//! Text transforms.

use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::text::{decode_html, strip_tags};
use super::FieldError;

/// A text-to-text function applied to every captured span before coercion.
pub type Transform = Arc<dyn Fn(String) -> String + Send + Sync>;

/// Transforms addressable by name from schema definition files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuiltinTransform {
    /// Trim leading/trailing whitespace.
    Trim,
    /// Lowercase.
    Lowercase,
    /// Uppercase.
    Uppercase,
    /// Collapse runs of whitespace into one space and trim.
    CollapseWhitespace,
    /// Decode HTML entities.
    DecodeHtml,
    /// Replace markup tags with a space.
    StripTags,
}

impl BuiltinTransform {
    /// Applies the transform.
    #[must_use]
    pub fn apply(self, value: String) -> String {
        match self {
            Self::Trim => value.trim().to_string(),
            Self::Lowercase => value.to_lowercase(),
            Self::Uppercase => value.to_uppercase(),
            Self::CollapseWhitespace => value.split_whitespace().collect::<Vec<_>>().join(" "),
            Self::DecodeHtml => decode_html(&value),
            Self::StripTags => strip_tags(&value),
        }
    }

    /// Wraps the transform as a shareable [`Transform`].
    #[must_use]
    pub fn into_transform(self) -> Transform {
        Arc::new(move |value| self.apply(value))
    }
}

impl FromStr for BuiltinTransform {
    type Err = FieldError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "trim" => Ok(Self::Trim),
            "lowercase" => Ok(Self::Lowercase),
            "uppercase" => Ok(Self::Uppercase),
            "collapse_whitespace" => Ok(Self::CollapseWhitespace),
            "decode_html" => Ok(Self::DecodeHtml),
            "strip_tags" => Ok(Self::StripTags),
            _ => Err(FieldError::UnknownTransform(s.to_string())),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_transforms() {
        assert_eq!(BuiltinTransform::Trim.apply("  x ".into()), "x");
        assert_eq!(BuiltinTransform::Uppercase.apply("abc".into()), "ABC");
        assert_eq!(
            BuiltinTransform::CollapseWhitespace.apply(" a \n\t b  c ".into()),
            "a b c"
        );
        assert_eq!(BuiltinTransform::StripTags.apply("<i>x</i>".into()), " x ");
    }

    #[test]
    fn test_from_str() {
        assert_eq!(
            "Decode_HTML".parse::<BuiltinTransform>().unwrap(),
            BuiltinTransform::DecodeHtml
        );
        assert!(matches!(
            "shout".parse::<BuiltinTransform>(),
            Err(FieldError::UnknownTransform(name)) if name == "shout"
        ));
    }

    #[test]
    fn test_deserialize_snake_case() {
        let parsed: Vec<BuiltinTransform> =
            serde_json::from_str(r#"["trim", "collapse_whitespace"]"#).unwrap();
        assert_eq!(
            parsed,
            [BuiltinTransform::Trim, BuiltinTransform::CollapseWhitespace]
        );
    }

    #[test]
    fn test_into_transform() {
        let transform = BuiltinTransform::Lowercase.into_transform();
        assert_eq!(transform("MiXeD".to_string()), "mixed");
    }
}
