//! The validation pipeline.
//!
//! A run moves through `Start → FormatResolved → SchemaChecked → ConstraintChecked
//! → Done`, or is aborted from any state by a configuration or processing error.
//! Every run produces exactly one [`Verdict`]; a failing schema stage ends the run
//! without invoking the constraint stage.

use std::fmt;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use crate::config::ValidatorConfig;
use crate::constraint::{ConstraintValidator, RuleSetValidator};
use crate::error::{ConfigurationError, ProcessingError};
use crate::format::detect::ContentSniffer;
use crate::format::{Format, FormatDetector, resolve_format};
use crate::report::{ValidationOutcome, Verdict};
use crate::reporter::{LoggingReporter, ResultReporter, Stage};
use crate::strategy::{SchemaStrategy, StrategyTable};

/// A target file checked to exist and be readable before any stage runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationTarget {
    path: PathBuf,
}

impl ValidationTarget {
    /// Check the target precondition once, upfront.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError::MissingSource` for an empty path,
    /// `MissingTarget` if nothing exists at `path`, `NotAFile` for directories and
    /// other non-regular files, and `UnreadableTarget` if it cannot be opened.
    pub fn new(path: impl Into<PathBuf>) -> Result<Self, ConfigurationError> {
        let path = path.into();
        if path.as_os_str().is_empty() {
            return Err(ConfigurationError::MissingSource);
        }

        let metadata = std::fs::metadata(&path).map_err(|source| match source.kind() {
            io::ErrorKind::NotFound => ConfigurationError::MissingTarget(path.clone()),
            _ => ConfigurationError::UnreadableTarget {
                path: path.clone(),
                source,
            },
        })?;
        if !metadata.is_file() {
            return Err(ConfigurationError::NotAFile(path));
        }

        // opened only to prove readability; closed immediately
        if let Err(source) = File::open(&path) {
            return Err(ConfigurationError::UnreadableTarget { path, source });
        }
        Ok(Self { path })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Orchestrates format resolution, schema validation and constraint validation.
pub struct ValidationPipeline {
    detector: Box<dyn FormatDetector>,
    strategies: StrategyTable,
    constraints: Box<dyn ConstraintValidator>,
    reporter: Box<dyn ResultReporter>,
}

impl fmt::Debug for ValidationPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidationPipeline")
            .field("strategies", &self.strategies)
            .finish_non_exhaustive()
    }
}

impl ValidationPipeline {
    /// A pipeline with content sniffing, no constraint rules and logging reporter.
    #[must_use]
    pub fn new(strategies: StrategyTable) -> Self {
        Self {
            detector: Box::new(ContentSniffer),
            strategies,
            constraints: Box::new(RuleSetValidator::default()),
            reporter: Box::new(LoggingReporter),
        }
    }

    /// Build a pipeline from configuration, loading its constraint rule files.
    ///
    /// Schema sources are only opened when a run needs them.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError::Config` if a rule file cannot be loaded.
    pub fn from_config(config: &ValidatorConfig) -> Result<Self, ConfigurationError> {
        let constraints = RuleSetValidator::from_files(&config.constraints)?;
        Ok(Self::new(StrategyTable::from_config(config)).with_constraints(constraints))
    }

    #[must_use]
    pub fn with_detector(mut self, detector: impl FormatDetector + 'static) -> Self {
        self.detector = Box::new(detector);
        self
    }

    #[must_use]
    pub fn with_constraints(mut self, constraints: impl ConstraintValidator + 'static) -> Self {
        self.constraints = Box::new(constraints);
        self
    }

    #[must_use]
    pub fn with_reporter(mut self, reporter: impl ResultReporter + 'static) -> Self {
        self.reporter = Box::new(reporter);
        self
    }

    #[must_use]
    pub fn with_strategy(
        mut self,
        format: Format,
        strategy: impl SchemaStrategy + 'static,
    ) -> Self {
        self.strategies.insert(format, Box::new(strategy));
        self
    }

    /// Check the target precondition, then run the pipeline.
    #[must_use]
    pub fn validate_path(&self, path: impl Into<PathBuf>, hint: Option<&str>) -> ValidationOutcome {
        let path = path.into();
        match ValidationTarget::new(&path) {
            Ok(target) => self.run(&target, hint),
            Err(err) => configuration_error(&path, &err),
        }
    }

    /// Run every stage for `target` and return the single verdict of the run.
    ///
    /// A `hint` overrides format detection; a document that does not parse in
    /// the hinted format is a `ProcessingError`.
    #[must_use]
    pub fn run(&self, target: &ValidationTarget, hint: Option<&str>) -> ValidationOutcome {
        let path = target.path();

        let format = match resolve_format(hint, path, self.detector.as_ref()) {
            Ok(format) => format,
            Err(err) => return configuration_error(path, &err),
        };
        tracing::debug!(
            path = %path.display(),
            %format,
            hinted = hint.is_some(),
            "format resolved"
        );

        let strategy = match self.strategies.get(format) {
            Ok(strategy) => strategy,
            Err(err) => {
                let mut outcome = configuration_error(path, &err);
                outcome.format = Some(format);
                return outcome;
            }
        };

        let schema = match strategy.validate(path) {
            Ok(result) => result,
            Err(err) => return processing_error(path, format, &err),
        };
        tracing::debug!(
            path = %path.display(),
            passing = schema.is_passing(),
            findings = schema.findings.len(),
            "schema checked"
        );

        if !schema.is_passing() {
            self.reporter.report(Stage::Schema, &schema);
            let mut outcome = ValidationOutcome::new(path, Verdict::SchemaInvalid);
            outcome.format = Some(format);
            outcome.schema = Some(schema);
            return finish(outcome);
        }

        let constraints = match self.constraints.validate(path, format) {
            Ok(result) => result,
            Err(err) => {
                let mut outcome = processing_error(path, format, &err);
                outcome.schema = Some(schema);
                return outcome;
            }
        };
        tracing::debug!(
            path = %path.display(),
            passing = constraints.is_passing(),
            findings = constraints.findings.len(),
            "constraints checked"
        );

        let verdict = if constraints.is_passing() {
            Verdict::Valid
        } else {
            self.reporter.report(Stage::Constraint, &constraints);
            Verdict::ConstraintInvalid
        };
        let mut outcome = ValidationOutcome::new(path, verdict);
        outcome.format = Some(format);
        outcome.schema = Some(schema);
        outcome.constraints = Some(constraints);
        finish(outcome)
    }
}

fn finish(outcome: ValidationOutcome) -> ValidationOutcome {
    tracing::debug!(
        path = %outcome.target.display(),
        verdict = %outcome.verdict,
        "validation done"
    );
    outcome
}

fn configuration_error(path: &Path, err: &ConfigurationError) -> ValidationOutcome {
    tracing::debug!(path = %path.display(), error = %err, "validation aborted");
    let mut outcome = ValidationOutcome::new(path, Verdict::ConfigurationError);
    outcome.message = Some(err.to_string());
    outcome
}

fn processing_error(path: &Path, format: Format, err: &ProcessingError) -> ValidationOutcome {
    tracing::debug!(path = %path.display(), error = %err, "validation aborted");
    let mut outcome = ValidationOutcome::new(path, Verdict::ProcessingError);
    outcome.format = Some(format);
    outcome.message = Some(err.to_string());
    outcome
}
