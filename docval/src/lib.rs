//! # docval
//!
//! Schema and constraint validation for XML, JSON and YAML documents.
//!
//! A [`ValidationPipeline`] resolves the format of one target document (from an
//! explicit hint or by sniffing its content), validates it against the schema for
//! that format, and, only if the schema stage passes, evaluates constraint rules
//! against it. Each run yields exactly one [`Verdict`].
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::path::PathBuf;
//! use docval::{ValidationPipeline, ValidatorConfig};
//!
//! let mut config = ValidatorConfig::default();
//! config.json_schema = Some(PathBuf::from("schemas/catalog.schema.json"));
//! config.constraints = vec![PathBuf::from("rules/catalog.yaml")];
//!
//! let pipeline = ValidationPipeline::from_config(&config).unwrap();
//! let outcome = pipeline.validate_path("catalog.yaml", None);
//! println!("Verdict: {}", outcome.verdict);
//! std::process::exit(i32::from(outcome.verdict.exit_code()));
//! ```

mod config;
pub mod constraint;
mod error;
pub mod format;
pub mod fs;
pub mod output;
mod pipeline;
mod report;
mod reporter;
pub mod schema;
pub mod strategy;

pub use config::ValidatorConfig;
pub use constraint::{ConstraintValidator, RuleSet, RuleSetValidator};
pub use error::{ConfigError, ConfigurationError, ProcessingError};
pub use format::detect::ContentSniffer;
pub use format::{Format, FormatDetector, resolve_format};
pub use pipeline::{ValidationPipeline, ValidationTarget};
pub use report::{Finding, Location, Severity, ValidationOutcome, ValidationResult, Verdict};
pub use reporter::{LoggingReporter, ResultReporter, Stage};
pub use schema::{JsonSchemaValidator, XsdSchema};
pub use strategy::{SchemaStrategy, StrategyTable};
