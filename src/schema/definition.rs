//! JSON schema definition files.
//!
//! ```json
//! {
//!   "name": "product",
//!   "drop_before": "<main>",
//!   "fields": [
//!     { "name": "title", "type": "text", "lower": "<h1>", "upper": "</h1>", "trim": true },
//!     { "name": "price", "type": "float", "lower": "Price:", "upper": "EUR", "decimal_mark": "," },
//!     { "name": "in_stock", "type": "presence", "pattern": "In stock" },
//!     { "name": "tags", "type": "text", "lower": "<li>", "upper": "</li>", "all": true,
//!       "transforms": ["collapse_whitespace", "lowercase"] }
//!   ]
//! }
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{Schema, SchemaError};
use crate::field::{BuiltinTransform, DEFAULT_DECIMAL_MARK, DEFAULT_THOUSANDS_MARKS, FieldSpec};

/// Top-level schema definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaDef {
    /// Schema name.
    pub name: String,
    /// Window start pattern.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub drop_before: Option<String>,
    /// Window end pattern.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub drop_after: Option<String>,
    /// Fields in declaration order.
    #[serde(default)]
    pub fields: Vec<FieldDef>,
}

/// One field of a definition file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDef {
    /// Field name.
    pub name: String,
    /// Variant and its options.
    #[serde(flatten)]
    pub kind: FieldDefKind,
    /// Collect every match.
    #[serde(default)]
    pub all: bool,
    /// Let bodies cross line breaks.
    #[serde(default)]
    pub spanning_lines: bool,
    /// Named transforms, in order.
    #[serde(default)]
    pub transforms: Vec<BuiltinTransform>,
    /// Explicit dependencies.
    #[serde(default)]
    pub depends_on: Vec<String>,
}

fn default_thousands_marks() -> Vec<char> {
    DEFAULT_THOUSANDS_MARKS.to_vec()
}

fn default_decimal_mark() -> char {
    DEFAULT_DECIMAL_MARK
}

fn default_true() -> bool {
    true
}

/// Variant of a defined field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FieldDefKind {
    Presence {
        pattern: String,
    },
    Text {
        lower: String,
        upper: String,
        #[serde(default)]
        trim: bool,
        #[serde(default)]
        strip_tags: bool,
        #[serde(default)]
        decode_html: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        prefix: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        suffix: Option<String>,
    },
    Integer {
        lower: String,
        upper: String,
        #[serde(default = "default_thousands_marks")]
        thousands_marks: Vec<char>,
    },
    Float {
        lower: String,
        upper: String,
        #[serde(default = "default_decimal_mark")]
        decimal_mark: char,
    },
    Resource {
        lower: String,
        upper: String,
        upload_to: PathBuf,
        #[serde(default)]
        swallow_errors: bool,
    },
    Nested {
        lower: String,
        upper: String,
        schema: Box<SchemaDef>,
        #[serde(default = "default_true")]
        detect_addresses: bool,
    },
}

impl SchemaDef {
    /// Parses a definition from JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::Definition`] on malformed JSON or unknown field types.
    pub fn from_json(text: &str) -> Result<Self, SchemaError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Reads a definition file.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::Io`] if the file cannot be read, or
    /// [`SchemaError::Definition`] if it is not a valid definition.
    pub fn load(path: &Path) -> Result<Self, SchemaError> {
        let text = std::fs::read_to_string(path).map_err(|source| SchemaError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), "loaded schema definition");
        Self::from_json(&text)
    }

    /// Builds the runtime schema, recursively for nested fields.
    ///
    /// # Errors
    ///
    /// Returns any [`SchemaError`] raised while building this or a nested schema.
    pub fn into_schema(self) -> Result<Schema, SchemaError> {
        let mut builder = Schema::builder(self.name);
        if let Some(pattern) = self.drop_before {
            builder = builder.drop_before(pattern);
        }
        if let Some(pattern) = self.drop_after {
            builder = builder.drop_after(pattern);
        }
        for field in self.fields {
            let name = field.name.clone();
            builder = builder.field(name, field.into_spec()?);
        }
        builder.build()
    }
}

impl FieldDef {
    fn into_spec(self) -> Result<FieldSpec, SchemaError> {
        let mut spec = match self.kind {
            FieldDefKind::Presence { pattern } => FieldSpec::presence(pattern),
            FieldDefKind::Text {
                lower,
                upper,
                trim,
                strip_tags,
                decode_html,
                prefix,
                suffix,
            } => {
                let mut spec = FieldSpec::text(lower, upper);
                if trim {
                    spec = spec.trimmed();
                }
                if strip_tags {
                    spec = spec.strip_tags();
                }
                if decode_html {
                    spec = spec.decode_html();
                }
                if let Some(prefix) = prefix {
                    spec = spec.prefix(prefix);
                }
                if let Some(suffix) = suffix {
                    spec = spec.suffix(suffix);
                }
                spec
            }
            FieldDefKind::Integer {
                lower,
                upper,
                thousands_marks,
            } => FieldSpec::integer(lower, upper).thousands_marks(&thousands_marks),
            FieldDefKind::Float {
                lower,
                upper,
                decimal_mark,
            } => FieldSpec::float(lower, upper).decimal_mark(decimal_mark),
            FieldDefKind::Resource {
                lower,
                upper,
                upload_to,
                swallow_errors,
            } => {
                let spec = FieldSpec::resource(lower, upper, upload_to);
                if swallow_errors {
                    spec.swallow_errors()
                } else {
                    spec
                }
            }
            FieldDefKind::Nested {
                lower,
                upper,
                schema,
                detect_addresses,
            } => {
                let spec = FieldSpec::nested(lower, upper, Arc::new(schema.into_schema()?));
                if detect_addresses {
                    spec
                } else {
                    spec.literal_content()
                }
            }
        };

        if self.all {
            spec = spec.all();
        }
        if self.spanning_lines {
            spec = spec.spanning_lines();
        }
        for transform in self.transforms {
            spec = spec.with_transform(transform.into_transform());
        }
        for dependency in self.depends_on {
            spec = spec.depends_on(dependency);
        }
        Ok(spec)
    }
}

impl Schema {
    /// Loads and builds a schema from a JSON definition file.
    ///
    /// # Errors
    ///
    /// See [`SchemaDef::load`] and [`SchemaDef::into_schema`].
    pub fn from_file(path: &Path) -> Result<Self, SchemaError> {
        SchemaDef::load(path)?.into_schema()
    }
}
