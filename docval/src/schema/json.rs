//! JSON Schema validation via `jsonschema`.

use std::io::Read;
use std::path::{Path, PathBuf};

use jsonschema::Validator;
use serde_json::Value;

use crate::error::ProcessingError;
use crate::format::json::read_json;
use crate::report::{Finding, Location, ValidationResult};

/// A compiled JSON Schema.
pub struct JsonSchemaValidator {
    validator: Validator,
    source: PathBuf,
}

impl std::fmt::Debug for JsonSchemaValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonSchemaValidator")
            .field("source", &self.source)
            .finish_non_exhaustive()
    }
}

impl JsonSchemaValidator {
    /// Compile a schema read from a byte stream.
    ///
    /// `source` names the stream in error messages.
    ///
    /// # Errors
    ///
    /// Returns `ProcessingError::SchemaResource` if the stream cannot be read, is not
    /// JSON, or is not a valid JSON Schema.
    pub fn from_reader(reader: impl Read, source: &Path) -> Result<Self, ProcessingError> {
        let schema: Value =
            serde_json::from_reader(reader).map_err(|e| ProcessingError::SchemaResource {
                path: source.to_owned(),
                message: format!("not a JSON document: {e}"),
            })?;
        Self::from_value(&schema, source)
    }

    /// Compile an in-memory schema.
    ///
    /// # Errors
    ///
    /// Returns `ProcessingError::SchemaResource` if `schema` is not a valid JSON Schema.
    pub fn from_value(schema: &Value, source: &Path) -> Result<Self, ProcessingError> {
        let validator =
            jsonschema::validator_for(schema).map_err(|e| ProcessingError::SchemaResource {
                path: source.to_owned(),
                message: format!("not a valid JSON Schema: {e}"),
            })?;
        Ok(Self {
            validator,
            source: source.to_owned(),
        })
    }

    /// Read a JSON document from disk and validate it.
    ///
    /// # Errors
    ///
    /// Returns a `ProcessingError` if the target cannot be read or is not valid JSON.
    pub fn validate_path(&self, target: &Path) -> Result<ValidationResult, ProcessingError> {
        let instance = read_json(target)?;
        Ok(self.validate_value(&instance, target))
    }

    /// Validate an in-memory value tree; findings are attributed to `document`.
    #[must_use]
    pub fn validate_value(&self, instance: &Value, document: &Path) -> ValidationResult {
        let findings = self
            .validator
            .iter_errors(instance)
            .map(|error| {
                let pointer = error.instance_path().as_str().to_owned();
                Finding::error(error.to_string()).at(Location::pointer(pointer))
            })
            .collect();
        ValidationResult::with_findings(document, findings)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn schema() -> JsonSchemaValidator {
        let schema = json!({
            "type": "object",
            "required": ["title"],
            "properties": {
                "title": {"type": "string"},
                "pages": {"type": "integer", "minimum": 1}
            }
        });
        JsonSchemaValidator::from_value(&schema, Path::new("book.schema.json")).unwrap()
    }

    #[test]
    fn test_valid_instance_passes() {
        let result = schema().validate_value(&json!({"title": "Dune"}), Path::new("a.json"));
        assert!(result.is_passing());
        assert!(result.findings.is_empty());
    }

    #[test]
    fn test_findings_carry_pointer() {
        let result = schema().validate_value(
            &json!({"title": "Dune", "pages": 0}),
            Path::new("a.json"),
        );
        assert!(!result.is_passing());
        assert_eq!(result.findings.len(), 1);
        assert_eq!(result.findings[0].location, Some(Location::pointer("/pages")));
    }

    #[test]
    fn test_missing_property_is_named() {
        let result = schema().validate_value(&json!({}), Path::new("a.json"));
        assert!(result.findings[0].message.contains("title"));
    }

    #[test]
    fn test_from_reader() {
        let bytes = br#"{"type": "array"}"#;
        let validator =
            JsonSchemaValidator::from_reader(&bytes[..], Path::new("array.json")).unwrap();
        assert!(validator.validate_value(&json!([]), Path::new("x")).is_passing());
        assert!(!validator.validate_value(&json!({}), Path::new("x")).is_passing());
    }

    #[test]
    fn test_invalid_schema_is_resource_error() {
        let err = JsonSchemaValidator::from_value(&json!({"type": 12}), Path::new("bad.json"))
            .unwrap_err();
        assert!(matches!(err, ProcessingError::SchemaResource { .. }));

        let err = JsonSchemaValidator::from_reader(&b"not json"[..], Path::new("bad.json"))
            .unwrap_err();
        assert!(matches!(err, ProcessingError::SchemaResource { .. }));
    }
}
