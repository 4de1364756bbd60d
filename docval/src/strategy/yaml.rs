//! YAML targets: normalized to a JSON value tree and checked with the same JSON
//! Schema validator used for JSON targets.

use std::path::{Path, PathBuf};

use crate::error::ProcessingError;
use crate::format::yaml::normalize_yaml;
use crate::report::ValidationResult;
use crate::strategy::SchemaStrategy;
use crate::strategy::json::load_json_schema;

#[derive(Debug, Clone)]
pub struct YamlStrategy {
    schema: PathBuf,
}

impl YamlStrategy {
    #[must_use]
    pub fn new(schema: impl Into<PathBuf>) -> Self {
        Self {
            schema: schema.into(),
        }
    }
}

impl SchemaStrategy for YamlStrategy {
    fn validate(&self, target: &Path) -> Result<ValidationResult, ProcessingError> {
        let validator = load_json_schema(&self.schema)?;
        let instance = normalize_yaml(target)?;
        // findings keep referring to the YAML file, not a JSON rendition of it
        Ok(validator.validate_value(&instance, target))
    }
}
