//! Declarative field specifications.
//!
//! A [`FieldSpec`] describes how to carve one value (or every value) out of a
//! Document's text: the body between a lower and an upper delimiter pattern
//! (`lower(.*?)upper`, non-greedy), run through an ordered list of text
//! transforms and then coerced according to its [`FieldKind`].
//!
//! Specs are immutable once registered in a [`Schema`](crate::schema::Schema)
//! and shared read-only by every Document of that schema.
//!
//! # Example
//!
//! ```
//! use harvester_core::field::FieldSpec;
//!
//! let price = FieldSpec::float("Price:", "USD");
//! let title = FieldSpec::text("<h1>", "</h1>").trimmed().strip_tags();
//! let tags = FieldSpec::text("<li>", "</li>").all().transform(|s| s.to_lowercase());
//! # let _ = (price, title, tags);
//! ```

mod coerce;
mod error;
pub(crate) mod extract;
mod text;
mod transform;
mod value;

pub use coerce::{parse_float, parse_integer, text_value};
pub use error::{FieldError, MalformedNumber};
pub use text::{decode_html, strip_tags};
pub use transform::{BuiltinTransform, Transform};
pub use value::FieldValue;

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use crate::schema::Schema;

/// Default thousands-separator markers stripped by integer fields.
pub const DEFAULT_THOUSANDS_MARKS: [char; 2] = ['.', ','];

/// Default decimal mark of floating-point fields.
pub const DEFAULT_DECIMAL_MARK: char = '.';

/// Whether a field yields the first match or every match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Multiplicity {
    /// First match only; absent when nothing matches.
    #[default]
    Single,
    /// Every non-overlapping match in document order; empty when nothing matches.
    All,
}

/// Whether the captured body may cross line breaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineMode {
    /// `.` does not match `\n`.
    #[default]
    LineBounded,
    /// `.` matches `\n` as well.
    Spanning,
}

/// What to do when a resource download fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorPolicy {
    /// Fail the field, and with it the Document.
    #[default]
    Propagate,
    /// Log the failure and leave the value absent.
    Swallow,
}

/// Options of a text field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextOptions {
    /// Trim leading/trailing whitespace.
    pub trim: bool,
    /// Replace every `<...>` tag with a single space.
    pub strip_tags: bool,
    /// Decode common HTML entities.
    pub decode_html: bool,
    /// Field whose resolved value is prepended.
    pub prefix: Option<String>,
    /// Field whose resolved value is appended.
    pub suffix: Option<String>,
}

/// Options of a downloaded-resource field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceOptions {
    /// Destination directory, created on demand.
    pub upload_to: PathBuf,
    /// Failure policy.
    pub on_error: ErrorPolicy,
}

/// Options of a nested-document field.
#[derive(Debug, Clone)]
pub struct NestedOptions {
    /// Schema used to resolve the child Document.
    pub schema: Arc<Schema>,
    /// Treat address-like spans as addresses to fetch. When false the span is
    /// always parsed as literal content.
    pub detect_addresses: bool,
}

/// Variant-specific coercion of a field.
#[derive(Debug, Clone)]
pub enum FieldKind {
    /// True iff the pattern occurs anywhere in the text.
    Presence {
        /// Pattern searched for.
        pattern: String,
    },
    /// Text with optional cleanup and prefix/suffix composition.
    Text(TextOptions),
    /// Base-10 integer after stripping thousands markers.
    Integer {
        /// Characters removed before parsing.
        thousands_marks: Vec<char>,
    },
    /// Floating point with a configurable decimal mark.
    Float {
        /// Decimal mark; the other of `.`/`,` is the thousands separator.
        decimal_mark: char,
    },
    /// Address of a resource downloaded to disk; the value is the saved path.
    Resource(ResourceOptions),
    /// Child Document, parsed from the span or fetched from it.
    Nested(NestedOptions),
}

impl FieldKind {
    /// Short name used in logs and errors.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Presence { .. } => "presence",
            Self::Text(_) => "text",
            Self::Integer { .. } => "integer",
            Self::Float { .. } => "float",
            Self::Resource(_) => "resource",
            Self::Nested(_) => "nested",
        }
    }
}

/// Immutable description of how to extract and coerce one named value.
///
/// Builder methods that only make sense for one kind (e.g. [`trimmed`](Self::trimmed)
/// on a text field) have no effect on other kinds.
#[derive(Clone)]
pub struct FieldSpec {
    lower: String,
    upper: String,
    multiplicity: Multiplicity,
    line_mode: LineMode,
    transforms: Vec<Transform>,
    /// Names given to `depends_on`.
    declared: Vec<String>,
    /// `declared` plus the text prefix/suffix sources, without repeats.
    dependencies: Vec<String>,
    kind: FieldKind,
}

impl fmt::Debug for FieldSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldSpec")
            .field("lower", &self.lower)
            .field("upper", &self.upper)
            .field("multiplicity", &self.multiplicity)
            .field("line_mode", &self.line_mode)
            .field("transforms", &self.transforms.len())
            .field("dependencies", &self.dependencies)
            .field("kind", &self.kind)
            .finish()
    }
}

impl FieldSpec {
    fn with_kind(lower: impl Into<String>, upper: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            lower: lower.into(),
            upper: upper.into(),
            multiplicity: Multiplicity::Single,
            line_mode: LineMode::LineBounded,
            transforms: Vec::new(),
            declared: Vec::new(),
            dependencies: Vec::new(),
            kind,
        }
    }

    /// Presence field: true iff `pattern` matches anywhere.
    #[must_use]
    pub fn presence(pattern: impl Into<String>) -> Self {
        let pattern = pattern.into();
        Self::with_kind(
            pattern.clone(),
            pattern.clone(),
            FieldKind::Presence { pattern },
        )
    }

    /// Text field.
    #[must_use]
    pub fn text(lower: impl Into<String>, upper: impl Into<String>) -> Self {
        Self::with_kind(lower, upper, FieldKind::Text(TextOptions::default()))
    }

    /// Integer field stripping `.` and `,` by default.
    #[must_use]
    pub fn integer(lower: impl Into<String>, upper: impl Into<String>) -> Self {
        Self::with_kind(
            lower,
            upper,
            FieldKind::Integer {
                thousands_marks: DEFAULT_THOUSANDS_MARKS.to_vec(),
            },
        )
    }

    /// Floating-point field with `.` as decimal mark by default.
    #[must_use]
    pub fn float(lower: impl Into<String>, upper: impl Into<String>) -> Self {
        Self::with_kind(
            lower,
            upper,
            FieldKind::Float {
                decimal_mark: DEFAULT_DECIMAL_MARK,
            },
        )
    }

    /// Resource field saving downloads under `upload_to`.
    #[must_use]
    pub fn resource(
        lower: impl Into<String>,
        upper: impl Into<String>,
        upload_to: impl Into<PathBuf>,
    ) -> Self {
        Self::with_kind(
            lower,
            upper,
            FieldKind::Resource(ResourceOptions {
                upload_to: upload_to.into(),
                on_error: ErrorPolicy::Propagate,
            }),
        )
    }

    /// Nested-document field resolved with `schema`.
    #[must_use]
    pub fn nested(lower: impl Into<String>, upper: impl Into<String>, schema: Arc<Schema>) -> Self {
        Self::with_kind(
            lower,
            upper,
            FieldKind::Nested(NestedOptions {
                schema,
                detect_addresses: true,
            }),
        )
    }

    /// Collect every match instead of the first.
    #[must_use]
    pub fn all(mut self) -> Self {
        self.multiplicity = Multiplicity::All;
        self
    }

    /// Sets the multiplicity explicitly.
    #[must_use]
    pub fn multiplicity(mut self, multiplicity: Multiplicity) -> Self {
        self.multiplicity = multiplicity;
        self
    }

    /// Let the captured body cross line breaks.
    #[must_use]
    pub fn spanning_lines(mut self) -> Self {
        self.line_mode = LineMode::Spanning;
        self
    }

    /// Sets the line mode explicitly.
    #[must_use]
    pub fn line_mode(mut self, line_mode: LineMode) -> Self {
        self.line_mode = line_mode;
        self
    }

    /// Appends a text transform, applied to every captured span before coercion.
    #[must_use]
    pub fn transform<F>(mut self, f: F) -> Self
    where
        F: Fn(String) -> String + Send + Sync + 'static,
    {
        self.transforms.push(Arc::new(f));
        self
    }

    /// Appends an already-shared transform.
    #[must_use]
    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transforms.push(transform);
        self
    }

    /// Declares that `field` must be resolved before this one.
    #[must_use]
    pub fn depends_on(mut self, field: impl Into<String>) -> Self {
        let field = field.into();
        if !self.declared.contains(&field) {
            self.declared.push(field);
        }
        self.refresh_dependencies();
        self
    }

    /// Text: trim leading/trailing whitespace.
    #[must_use]
    pub fn trimmed(mut self) -> Self {
        if let FieldKind::Text(options) = &mut self.kind {
            options.trim = true;
        }
        self
    }

    /// Text: replace markup tags with a space.
    #[must_use]
    pub fn strip_tags(mut self) -> Self {
        if let FieldKind::Text(options) = &mut self.kind {
            options.strip_tags = true;
        }
        self
    }

    /// Text: decode HTML entities.
    #[must_use]
    pub fn decode_html(mut self) -> Self {
        if let FieldKind::Text(options) = &mut self.kind {
            options.decode_html = true;
        }
        self
    }

    /// Text: prepend the resolved value of `field`. Adds a dependency on it,
    /// replacing the one of an earlier prefix.
    #[must_use]
    pub fn prefix(mut self, field: impl Into<String>) -> Self {
        if let FieldKind::Text(options) = &mut self.kind {
            options.prefix = Some(field.into());
        }
        self.refresh_dependencies();
        self
    }

    /// Text: append the resolved value of `field`. Adds a dependency on it,
    /// replacing the one of an earlier suffix.
    #[must_use]
    pub fn suffix(mut self, field: impl Into<String>) -> Self {
        if let FieldKind::Text(options) = &mut self.kind {
            options.suffix = Some(field.into());
        }
        self.refresh_dependencies();
        self
    }

    /// Integer: characters stripped before parsing.
    #[must_use]
    pub fn thousands_marks(mut self, marks: &[char]) -> Self {
        if let FieldKind::Integer { thousands_marks } = &mut self.kind {
            *thousands_marks = marks.to_vec();
        }
        self
    }

    /// Float: decimal mark (`.` or `,`).
    #[must_use]
    pub fn decimal_mark(mut self, mark: char) -> Self {
        if let FieldKind::Float { decimal_mark } = &mut self.kind {
            *decimal_mark = mark;
        }
        self
    }

    /// Resource: log download failures and leave the value absent.
    #[must_use]
    pub fn swallow_errors(mut self) -> Self {
        self.set_error_policy(ErrorPolicy::Swallow);
        self
    }

    /// Resource: sets the failure policy explicitly.
    #[must_use]
    pub fn on_error(mut self, policy: ErrorPolicy) -> Self {
        self.set_error_policy(policy);
        self
    }

    /// Nested: always parse the span as literal content, even if it looks like an address.
    #[must_use]
    pub fn literal_content(mut self) -> Self {
        if let FieldKind::Nested(options) = &mut self.kind {
            options.detect_addresses = false;
        }
        self
    }

    fn set_error_policy(&mut self, policy: ErrorPolicy) {
        if let FieldKind::Resource(options) = &mut self.kind {
            options.on_error = policy;
        }
    }

    fn refresh_dependencies(&mut self) {
        let siblings = match &self.kind {
            FieldKind::Text(options) => [options.prefix.as_ref(), options.suffix.as_ref()],
            _ => [None, None],
        };
        let mut dependencies = self.declared.clone();
        for name in siblings.into_iter().flatten() {
            if !dependencies.contains(name) {
                dependencies.push(name.clone());
            }
        }
        self.dependencies = dependencies;
    }

    /// Lower-bound pattern.
    #[must_use]
    pub fn lower(&self) -> &str {
        &self.lower
    }

    /// Upper-bound pattern.
    #[must_use]
    pub fn upper(&self) -> &str {
        &self.upper
    }

    /// Multiplicity.
    #[must_use]
    pub fn get_multiplicity(&self) -> Multiplicity {
        self.multiplicity
    }

    /// Line mode.
    #[must_use]
    pub fn get_line_mode(&self) -> LineMode {
        self.line_mode
    }

    /// Names of the fields resolved before this one.
    #[must_use]
    pub fn dependencies(&self) -> &[String] {
        &self.dependencies
    }

    /// Variant-specific coercion.
    #[must_use]
    pub fn kind(&self) -> &FieldKind {
        &self.kind
    }

    /// Number of declared transforms.
    #[must_use]
    pub fn transform_count(&self) -> usize {
        self.transforms.len()
    }

    /// Runs the transform pipeline over one captured span.
    #[must_use]
    pub fn apply_transforms(&self, span: &str) -> String {
        self.transforms
            .iter()
            .fold(span.to_string(), |value, transform| transform(value))
    }
}
