//! Resolved field values.

use std::path::{Path, PathBuf};

use serde::ser::{Serialize, SerializeSeq, Serializer};

use crate::document::Document;

/// The resolved value of one field.
#[derive(Debug, Clone, Default)]
pub enum FieldValue {
    /// No match, or a value that could not be produced.
    #[default]
    Absent,
    /// Presence result.
    Bool(bool),
    /// Text.
    Text(String),
    /// Integer.
    Integer(i64),
    /// Floating point.
    Float(f64),
    /// Path of a downloaded resource.
    Path(PathBuf),
    /// Fully resolved child Document.
    Document(Box<Document>),
    /// Every match of a multi-valued field, in document order.
    List(Vec<FieldValue>),
}

impl FieldValue {
    /// Returns true for [`FieldValue::Absent`].
    #[must_use]
    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }

    /// The flag of a presence field.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// The text of a text field.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// The number of an integer field.
    #[must_use]
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(n) => Some(*n),
            _ => None,
        }
    }

    /// The number of a float field.
    #[must_use]
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(n) => Some(*n),
            _ => None,
        }
    }

    /// The saved file of a resource field.
    #[must_use]
    pub fn as_path(&self) -> Option<&Path> {
        match self {
            Self::Path(p) => Some(p),
            _ => None,
        }
    }

    /// The child Document of a nested field.
    #[must_use]
    pub fn as_document(&self) -> Option<&Document> {
        match self {
            Self::Document(d) => Some(d),
            _ => None,
        }
    }

    /// The values of a field collecting every match.
    #[must_use]
    pub fn as_list(&self) -> Option<&[FieldValue]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    /// Renders scalar values as text, for prefix/suffix composition.
    ///
    /// Absent values, booleans, documents and lists have no text form.
    #[must_use]
    pub fn to_text(&self) -> Option<String> {
        match self {
            Self::Text(s) => Some(s.clone()),
            Self::Integer(n) => Some(n.to_string()),
            Self::Float(n) => Some(n.to_string()),
            Self::Path(p) => Some(p.display().to_string()),
            Self::Absent | Self::Bool(_) | Self::Document(_) | Self::List(_) => None,
        }
    }
}

impl Serialize for FieldValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Absent => serializer.serialize_none(),
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::Text(s) => serializer.serialize_str(s),
            Self::Integer(n) => serializer.serialize_i64(*n),
            Self::Float(n) => serializer.serialize_f64(*n),
            Self::Path(p) => serializer.serialize_str(&p.display().to_string()),
            Self::Document(d) => d.serialize(serializer),
            Self::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_accessors() {
        assert!(FieldValue::Absent.is_absent());
        assert_eq!(FieldValue::Bool(true).as_bool(), Some(true));
        assert_eq!(FieldValue::Text("x".into()).as_text(), Some("x"));
        assert_eq!(FieldValue::Integer(3).as_integer(), Some(3));
        assert_eq!(FieldValue::Float(1.5).as_float(), Some(1.5));
        assert_eq!(FieldValue::Text("x".into()).as_integer(), None);
        assert_eq!(
            FieldValue::List(vec![FieldValue::Integer(1)]).as_list().map(<[_]>::len),
            Some(1)
        );
    }

    #[test]
    fn test_to_text() {
        assert_eq!(FieldValue::Integer(7).to_text().as_deref(), Some("7"));
        assert_eq!(FieldValue::Text(String::new()).to_text().as_deref(), Some(""));
        assert_eq!(FieldValue::Absent.to_text(), None);
        assert_eq!(FieldValue::Bool(true).to_text(), None);
    }

    #[test]
    fn test_serialize_scalars_and_lists() {
        let value = FieldValue::List(vec![
            FieldValue::Text("a".into()),
            FieldValue::Absent,
            FieldValue::Integer(2),
            FieldValue::Bool(false),
            FieldValue::Path(PathBuf::from("/tmp/file.pdf")),
        ]);
        assert_eq!(
            serde_json::to_value(&value).unwrap(),
            serde_json::json!(["a", null, 2, false, "/tmp/file.pdf"])
        );
    }
}
