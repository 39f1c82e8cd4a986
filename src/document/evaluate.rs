//! Field evaluation: one exhaustive switch over the field kinds.

use std::sync::Arc;

use tracing::{debug, instrument, warn};

use super::{Document, Harvester, HarvestError, Source};
use crate::address;
use crate::field::{
    ErrorPolicy, FieldError, FieldKind, FieldValue, Multiplicity, NestedOptions, ResourceOptions,
    extract, parse_float, parse_integer, text_value,
};
use crate::resource;
use crate::schema::CompiledField;
use crate::source::FetchError;

impl Harvester {
    /// Computes the value of `field` against `document`.
    ///
    /// Sibling fields referenced as dependencies are already resolved.
    #[instrument(skip_all, fields(field = field.name(), kind = field.spec().kind().label()))]
    pub(super) async fn evaluate(
        &self,
        document: &Document,
        field: &CompiledField,
    ) -> Result<FieldValue, HarvestError> {
        let spec = field.spec();
        let text = document.extraction_text();

        if let FieldKind::Presence { .. } = spec.kind() {
            return Ok(FieldValue::Bool(field.regex().is_match(text)));
        }

        let multiplicity = spec.get_multiplicity();
        let spans = extract::bodies(field.regex(), text, multiplicity);
        debug!(matches = spans.len(), "extracted");

        let mut values = Vec::with_capacity(spans.len());
        for span in spans {
            let transformed = spec.apply_transforms(span);
            values.push(self.coerce(document, field, transformed).await?);
        }

        Ok(match multiplicity {
            Multiplicity::Single => values.into_iter().next().unwrap_or_default(),
            Multiplicity::All => FieldValue::List(values),
        })
    }

    async fn coerce(
        &self,
        document: &Document,
        field: &CompiledField,
        value: String,
    ) -> Result<FieldValue, HarvestError> {
        match field.spec().kind() {
            // Presence never reaches span coercion.
            FieldKind::Presence { .. } => Ok(FieldValue::Bool(true)),
            FieldKind::Text(options) => Ok(FieldValue::Text(text_value(value, options, |name| {
                document.get(name).and_then(FieldValue::to_text)
            }))),
            FieldKind::Integer { thousands_marks } => Ok(parse_integer(&value, thousands_marks)
                .map_or(FieldValue::Absent, FieldValue::Integer)),
            FieldKind::Float { decimal_mark } => parse_float(&value, *decimal_mark)
                .map(|n| n.map_or(FieldValue::Absent, FieldValue::Float))
                .map_err(|e| HarvestError::from(FieldError::coercion(field.name(), e))),
            FieldKind::Resource(options) => {
                self.download_resource(document, field.name(), options, &value)
                    .await
            }
            FieldKind::Nested(options) => {
                self.nested_document(document, field.name(), options, value)
                    .await
            }
        }
    }

    async fn download_resource(
        &self,
        document: &Document,
        field: &str,
        options: &ResourceOptions,
        span: &str,
    ) -> Result<FieldValue, HarvestError> {
        let span = span.trim();
        if span.is_empty() {
            return Ok(FieldValue::Absent);
        }

        match self.save_resource(document, options, span).await {
            Ok(path) => Ok(FieldValue::Path(path)),
            Err(e) => match options.on_error {
                ErrorPolicy::Swallow => {
                    warn!(field, error = %e, "error downloading file, leaving value absent");
                    Ok(FieldValue::Absent)
                }
                ErrorPolicy::Propagate => Err(HarvestError::resource(field, e)),
            },
        }
    }

    async fn save_resource(
        &self,
        document: &Document,
        options: &ResourceOptions,
        span: &str,
    ) -> Result<std::path::PathBuf, FetchError> {
        let address = address::resolve_against(span, document.origin())?;
        let response = self.fetch(&address, None, document.config()).await?;
        resource::save(&response, &address, &options.upload_to).await
    }

    async fn nested_document(
        &self,
        document: &Document,
        field: &str,
        options: &NestedOptions,
        span: String,
    ) -> Result<FieldValue, HarvestError> {
        if span.is_empty() {
            return Ok(FieldValue::Absent);
        }

        let source = child_source(span, document.origin(), options.detect_addresses);
        debug!(
            field,
            fetch = matches!(source, Source::Address { .. }),
            "harvesting nested document"
        );
        let child = self
            .harvest_boxed(
                Arc::clone(&options.schema),
                source,
                document.config().clone(),
            )
            .await
            .map_err(|e| HarvestError::nested(field, e))?;
        Ok(FieldValue::Document(Box::new(child)))
    }
}

/// Decides whether a nested span is fetched or parsed as literal content.
///
/// Literal content keeps the parent's origin so relative addresses inside it
/// still resolve.
pub(crate) fn child_source(span: String, parent_origin: Option<&str>, detect: bool) -> Source {
    let literal = |text: String| Source::Content {
        text,
        base: parent_origin.map(str::to_string),
    };

    if !detect {
        return literal(span);
    }
    if address::is_address(&span) {
        return Source::address(span);
    }
    if span.starts_with('/') {
        if let Some(base) = parent_origin.and_then(address::base_address) {
            let absolute = format!("{base}{span}");
            if address::is_address(&absolute) {
                return Source::address(absolute);
            }
        }
    }
    literal(span)
}
