//! Schemas: named, ordered collections of field specifications.
//!
//! A [`Schema`] is built once, validated (patterns compile, no duplicate
//! names, no self-dependencies) and then shared read-only by every Document
//! that uses it. Schemas can also be loaded from JSON definition files, see
//! [`SchemaDef`].
//!
//! # Example
//!
//! ```
//! use harvester_core::field::FieldSpec;
//! use harvester_core::schema::Schema;
//!
//! let product = Schema::builder("product")
//!     .field("name", FieldSpec::text("<h1>", "</h1>").trimmed())
//!     .field("price", FieldSpec::float("Price:", "USD"))
//!     .drop_before("<body>")
//!     .build()?;
//! assert_eq!(product.len(), 2);
//! # Ok::<(), harvester_core::schema::SchemaError>(())
//! ```

mod definition;
mod error;

pub use definition::{FieldDef, FieldDefKind, SchemaDef};
pub use error::SchemaError;

use std::collections::HashSet;

use indexmap::IndexMap;
use regex::{Regex, RegexBuilder};

use crate::field::{FieldSpec, extract};

/// A field specification bound to its name, with its pattern compiled.
#[derive(Debug, Clone)]
pub struct CompiledField {
    name: String,
    spec: FieldSpec,
    regex: Regex,
}

impl CompiledField {
    /// Field name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Field specification.
    #[must_use]
    pub fn spec(&self) -> &FieldSpec {
        &self.spec
    }

    /// Compiled extraction pattern.
    #[must_use]
    pub fn regex(&self) -> &Regex {
        &self.regex
    }
}

/// Named, ordered set of compiled fields plus the content window.
#[derive(Debug, Clone)]
pub struct Schema {
    name: String,
    fields: IndexMap<String, CompiledField>,
    drop_before: Option<Regex>,
    drop_after: Option<Regex>,
}

impl Schema {
    /// Starts a new schema.
    #[must_use]
    pub fn builder(name: impl Into<String>) -> SchemaBuilder {
        SchemaBuilder {
            name: name.into(),
            fields: IndexMap::new(),
            inherited: HashSet::new(),
            duplicates: Vec::new(),
            drop_before: None,
            drop_after: None,
        }
    }

    /// Schema name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Fields in declaration order.
    pub fn fields(&self) -> impl Iterator<Item = &CompiledField> {
        self.fields.values()
    }

    /// Looks up a field by name.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&CompiledField> {
        self.fields.get(name)
    }

    /// Number of fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns true if the schema has no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Returns the part of `content` fields are extracted from.
    ///
    /// Everything up to and including the first `drop_before` match is
    /// removed, then everything from the first `drop_after` match on. A
    /// pattern that does not match leaves the content untouched.
    #[must_use]
    pub fn window<'a>(&self, content: &'a str) -> &'a str {
        let mut window = content;
        if let Some(m) = self.drop_before.as_ref().and_then(|re| re.find(window)) {
            window = &window[m.end()..];
        }
        if let Some(m) = self.drop_after.as_ref().and_then(|re| re.find(window)) {
            window = &window[..m.start()];
        }
        window
    }
}

/// Builder for [`Schema`].
#[derive(Debug)]
pub struct SchemaBuilder {
    name: String,
    fields: IndexMap<String, FieldSpec>,
    inherited: HashSet<String>,
    duplicates: Vec<String>,
    drop_before: Option<String>,
    drop_after: Option<String>,
}

impl SchemaBuilder {
    /// Copies every field and the content window of `parent`.
    ///
    /// Fields declared afterwards with the same name replace the inherited
    /// ones in place.
    #[must_use]
    pub fn inherit(mut self, parent: &Schema) -> Self {
        for field in parent.fields() {
            self.inherited.insert(field.name.clone());
            self.fields.insert(field.name.clone(), field.spec.clone());
        }
        if self.drop_before.is_none() {
            self.drop_before = parent.drop_before.as_ref().map(|re| re.as_str().to_string());
        }
        if self.drop_after.is_none() {
            self.drop_after = parent.drop_after.as_ref().map(|re| re.as_str().to_string());
        }
        self
    }

    /// Declares a field.
    #[must_use]
    pub fn field(mut self, name: impl Into<String>, spec: FieldSpec) -> Self {
        let name = name.into();
        if self.fields.contains_key(&name) && !self.inherited.remove(&name) {
            self.duplicates.push(name.clone());
        }
        self.fields.insert(name, spec);
        self
    }

    /// Drops everything up to and including the first match of `pattern`.
    #[must_use]
    pub fn drop_before(mut self, pattern: impl Into<String>) -> Self {
        self.drop_before = Some(pattern.into());
        self
    }

    /// Drops everything from the first match of `pattern` on.
    #[must_use]
    pub fn drop_after(mut self, pattern: impl Into<String>) -> Self {
        self.drop_after = Some(pattern.into());
        self
    }

    /// Validates and compiles the schema.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError`] on duplicate names, self-dependencies or
    /// patterns that do not compile. Dependencies on names the schema does
    /// not declare are reported when a Document is resolved.
    pub fn build(self) -> Result<Schema, SchemaError> {
        if let Some(name) = self.duplicates.into_iter().next() {
            return Err(SchemaError::DuplicateField(name));
        }

        let mut fields = IndexMap::with_capacity(self.fields.len());
        for (name, spec) in self.fields {
            if spec.dependencies().iter().any(|dep| *dep == name) {
                return Err(SchemaError::SelfDependency(name));
            }
            let regex = extract::compile(&name, &spec)?;
            fields.insert(name.clone(), CompiledField { name, spec, regex });
        }

        Ok(Schema {
            name: self.name,
            fields,
            drop_before: compile_window("drop_before", self.drop_before.as_deref())?,
            drop_after: compile_window("drop_after", self.drop_after.as_deref())?,
        })
    }
}

fn compile_window(which: &'static str, pattern: Option<&str>) -> Result<Option<Regex>, SchemaError> {
    pattern
        .map(|p| {
            RegexBuilder::new(p)
                .case_insensitive(true)
                .dot_matches_new_line(true)
                .build()
                .map_err(|e| SchemaError::Window {
                    which,
                    source: Box::new(e),
                })
        })
        .transpose()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn names(schema: &Schema) -> Vec<&str> {
        schema.fields().map(CompiledField::name).collect()
    }

    #[test]
    fn test_build_keeps_declaration_order() {
        let schema = Schema::builder("s")
            .field("b", FieldSpec::text("b", "b"))
            .field("a", FieldSpec::text("a", "a"))
            .field("c", FieldSpec::presence("c"))
            .build()
            .unwrap();
        assert_eq!(names(&schema), ["b", "a", "c"]);
        assert_eq!(schema.name(), "s");
        assert!(schema.field("a").is_some());
        assert!(schema.field("z").is_none());
    }

    #[test]
    fn test_duplicate_field_is_rejected() {
        let err = Schema::builder("s")
            .field("a", FieldSpec::text("a", "a"))
            .field("a", FieldSpec::text("b", "b"))
            .build()
            .unwrap_err();
        assert!(matches!(err, SchemaError::DuplicateField(name) if name == "a"));
    }

    #[test]
    fn test_self_dependency_is_rejected() {
        let err = Schema::builder("s")
            .field("a", FieldSpec::text("a", "a").depends_on("a"))
            .build()
            .unwrap_err();
        assert!(matches!(err, SchemaError::SelfDependency(name) if name == "a"));
    }

    #[test]
    fn test_invalid_pattern_is_rejected() {
        let err = Schema::builder("s")
            .field("broken", FieldSpec::text("[", "]"))
            .build()
            .unwrap_err();
        assert!(matches!(err, SchemaError::Field(_)));
    }

    #[test]
    fn test_unknown_dependency_is_accepted_at_build_time() {
        let schema = Schema::builder("s")
            .field("a", FieldSpec::text("a", "a").depends_on("ghost"))
            .build();
        assert!(schema.is_ok());
    }

    #[test]
    fn test_inherit_copies_and_overrides_in_place() {
        let parent = Schema::builder("base")
            .field("title", FieldSpec::text("<h1>", "</h1>"))
            .field("body", FieldSpec::text("<p>", "</p>"))
            .drop_before("<main>")
            .build()
            .unwrap();
        let child = Schema::builder("child")
            .inherit(&parent)
            .field("title", FieldSpec::text("<h2>", "</h2>"))
            .field("extra", FieldSpec::presence("x"))
            .build()
            .unwrap();

        assert_eq!(names(&child), ["title", "body", "extra"]);
        assert_eq!(child.field("title").unwrap().spec().lower(), "<h2>");
        assert_eq!(child.window("junk<MAIN>kept"), "kept");
    }

    #[test]
    fn test_window_drop_before_and_after() {
        let schema = Schema::builder("s")
            .drop_before("<body>")
            .drop_after("</body>")
            .build()
            .unwrap();
        assert_eq!(
            schema.window("<head>x</head><BODY>\ncontent\n</Body>tail"),
            "\ncontent\n"
        );
    }

    #[test]
    fn test_window_without_match_keeps_content() {
        let schema = Schema::builder("s").drop_before("nope").build().unwrap();
        assert_eq!(schema.window("all of it"), "all of it");

        let plain = Schema::builder("plain").build().unwrap();
        assert!(plain.is_empty());
        assert_eq!(plain.window("all of it"), "all of it");
    }

    #[test]
    fn test_invalid_window_pattern() {
        let err = Schema::builder("s").drop_after("(").build().unwrap_err();
        assert!(matches!(err, SchemaError::Window { which: "drop_after", .. }));
    }
}
