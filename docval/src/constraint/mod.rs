//! Semantic constraint validation.
//!
//! Runs after a passing schema stage. The default [`RuleSetValidator`] loads the
//! target into a format-agnostic value tree (JSON and YAML as-is, XML through
//! [`to_value`]) and evaluates declarative rules against it.

pub mod path;
pub mod rules;

use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::error::{ConfigError, ProcessingError};
use crate::format::Format;
use crate::format::json::read_json;
use crate::format::xml::{read_xml, to_value};
use crate::format::yaml::normalize_yaml;
use crate::report::ValidationResult;

pub use path::RulePath;
pub use rules::{Rule, RuleSet};

/// Semantic checks on a target that already passed schema validation.
pub trait ConstraintValidator {
    /// Check `target`, read with the model of the run's resolved `format`.
    ///
    /// # Errors
    ///
    /// Returns a `ProcessingError` when the target cannot be read or parsed.
    fn validate(&self, target: &Path, format: Format) -> Result<ValidationResult, ProcessingError>;
}

/// Load `target` into the value tree constraint rules are evaluated against.
///
/// # Errors
///
/// Returns a `ProcessingError` when the target cannot be read or parsed as `format`.
pub fn load_document(target: &Path, format: Format) -> Result<Value, ProcessingError> {
    match format {
        Format::Json => read_json(target),
        Format::Yaml => normalize_yaml(target),
        Format::Xml => read_xml(target).map(|root| to_value(&root)),
    }
}

/// Evaluates a [`RuleSet`] loaded from rule files.
#[derive(Debug, Clone, Default)]
pub struct RuleSetValidator {
    rules: RuleSet,
}

impl RuleSetValidator {
    #[must_use]
    pub fn new(rules: RuleSet) -> Self {
        Self { rules }
    }

    /// Load and merge the given rule files, in order.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` for the first file that cannot be read or parsed,
    /// or when two files declare the same rule id.
    pub fn from_files(files: &[PathBuf]) -> Result<Self, ConfigError> {
        let mut rules = RuleSet::default();
        for file in files {
            rules.extend(RuleSet::load(file)?, file)?;
        }
        Ok(Self { rules })
    }

    #[must_use]
    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }
}

impl ConstraintValidator for RuleSetValidator {
    fn validate(&self, target: &Path, format: Format) -> Result<ValidationResult, ProcessingError> {
        // nothing to evaluate; the target is not read again
        if self.rules.is_empty() {
            return Ok(ValidationResult::new(target));
        }
        let document = load_document(target, format)?;
        Ok(self.rules.evaluate(&document, target))
    }
}
