//! XML targets: validated directly against one or more XSD sources.

use std::path::{Path, PathBuf};

use crate::error::ProcessingError;
use crate::report::ValidationResult;
use crate::schema::XsdSchema;
use crate::strategy::SchemaStrategy;

#[derive(Debug, Clone)]
pub struct XsdStrategy {
    sources: Vec<PathBuf>,
}

impl XsdStrategy {
    #[must_use]
    pub fn new(sources: Vec<PathBuf>) -> Self {
        Self { sources }
    }
}

impl SchemaStrategy for XsdStrategy {
    fn validate(&self, target: &Path) -> Result<ValidationResult, ProcessingError> {
        XsdSchema::load(&self.sources)?.validate_path(target)
    }
}
