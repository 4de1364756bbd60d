//! Schema validation strategies.
//!
//! Each [`Format`] maps to one [`SchemaStrategy`] in a [`StrategyTable`]. The
//! pipeline only ever asks the table for the strategy of the resolved format, so
//! supporting a new format means adding a variant and a table entry.

pub mod json;
pub mod xml;
pub mod yaml;

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use crate::config::ValidatorConfig;
use crate::error::{ConfigurationError, ProcessingError};
use crate::format::Format;
use crate::report::ValidationResult;

pub use json::JsonStrategy;
pub use xml::XsdStrategy;
pub use yaml::YamlStrategy;

/// Format-specific schema validation of a target file.
pub trait SchemaStrategy: fmt::Debug {
    /// Validate `target` against this strategy's schema.
    ///
    /// # Errors
    ///
    /// Returns a `ProcessingError` when a schema source or the target cannot be
    /// read or parsed. Schema violations are findings, not errors.
    fn validate(&self, target: &Path) -> Result<ValidationResult, ProcessingError>;
}

/// Dispatch table from format to schema strategy.
#[derive(Debug, Default)]
pub struct StrategyTable {
    strategies: BTreeMap<Format, Box<dyn SchemaStrategy>>,
}

impl StrategyTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the table for the schemas named in `config`.
    ///
    /// XML is registered when at least one XSD source is configured; JSON and YAML
    /// share the configured JSON Schema.
    #[must_use]
    pub fn from_config(config: &ValidatorConfig) -> Self {
        let mut table = Self::new();
        if !config.xml_schemas.is_empty() {
            table.insert(
                Format::Xml,
                Box::new(XsdStrategy::new(config.xml_schemas.clone())),
            );
        }
        if let Some(schema) = &config.json_schema {
            table.insert(Format::Json, Box::new(JsonStrategy::new(schema.clone())));
            table.insert(Format::Yaml, Box::new(YamlStrategy::new(schema.clone())));
        }
        table
    }

    /// Register or replace the strategy for `format`.
    pub fn insert(&mut self, format: Format, strategy: Box<dyn SchemaStrategy>) {
        self.strategies.insert(format, strategy);
    }

    /// Look up the strategy for `format`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError::UnsupportedFormat` when nothing is registered.
    pub fn get(&self, format: Format) -> Result<&dyn SchemaStrategy, ConfigurationError> {
        self.strategies
            .get(&format)
            .map(Box::as_ref)
            .ok_or(ConfigurationError::UnsupportedFormat(format))
    }

    /// Formats that have a registered strategy.
    pub fn formats(&self) -> impl Iterator<Item = Format> + '_ {
        self.strategies.keys().copied()
    }
}
