//! JSON targets: the schema is opened as a byte stream, the target read from disk.

use std::fs::File;
use std::path::{Path, PathBuf};

use crate::error::ProcessingError;
use crate::report::ValidationResult;
use crate::schema::JsonSchemaValidator;
use crate::strategy::SchemaStrategy;

/// Compile the JSON Schema at `schema`.
///
/// The file handle is dropped before returning, on every path.
pub(crate) fn load_json_schema(schema: &Path) -> Result<JsonSchemaValidator, ProcessingError> {
    let file = File::open(schema).map_err(|e| ProcessingError::SchemaResource {
        path: schema.to_owned(),
        message: e.to_string(),
    })?;
    let validator = JsonSchemaValidator::from_reader(std::io::BufReader::new(file), schema)?;
    tracing::debug!(schema = %schema.display(), "compiled JSON Schema");
    Ok(validator)
}

#[derive(Debug, Clone)]
pub struct JsonStrategy {
    schema: PathBuf,
}

impl JsonStrategy {
    #[must_use]
    pub fn new(schema: impl Into<PathBuf>) -> Self {
        Self {
            schema: schema.into(),
        }
    }
}

impl SchemaStrategy for JsonStrategy {
    fn validate(&self, target: &Path) -> Result<ValidationResult, ProcessingError> {
        load_json_schema(&self.schema)?.validate_path(target)
    }
}
