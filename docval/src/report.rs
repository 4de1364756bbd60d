//! Validation results, findings and verdicts.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::format::Format;

/// Severity of a single finding, ordered from least to most severe.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Informational,
    Warning,
    #[default]
    Error,
    Critical,
}

impl Severity {
    /// Findings at or above this severity make a result failing.
    pub const FAILING_THRESHOLD: Self = Self::Error;

    #[must_use]
    pub fn is_failing(self) -> bool {
        self >= Self::FAILING_THRESHOLD
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Informational => "INFO",
            Self::Warning => "WARNING",
            Self::Error => "ERROR",
            Self::Critical => "CRITICAL",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Where in the document a finding applies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Location {
    /// 1-indexed line and column in the source text (XML, parse errors).
    Position { line: usize, column: usize },
    /// JSON pointer into the document's value tree (JSON, YAML, constraints).
    Pointer { pointer: String },
}

impl Location {
    #[must_use]
    pub fn pointer(pointer: impl Into<String>) -> Self {
        Self::Pointer {
            pointer: pointer.into(),
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Position { line, column } => write!(f, "{line}:{column}"),
            Self::Pointer { pointer } if pointer.is_empty() => f.write_str("/"),
            Self::Pointer { pointer } => f.write_str(pointer),
        }
    }
}

/// One diagnostic produced by a validation stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[non_exhaustive]
pub struct Finding {
    pub severity: Severity,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
    /// Identifier of the constraint rule that produced the finding, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rule: Option<String>,
}

impl Finding {
    #[must_use]
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
            location: None,
            rule: None,
        }
    }

    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self::new(Severity::Error, message)
    }

    #[must_use]
    pub fn at(mut self, location: Location) -> Self {
        self.location = Some(location);
        self
    }

    #[must_use]
    pub fn with_rule(mut self, rule: impl Into<String>) -> Self {
        self.rule = Some(rule.into());
        self
    }

    /// Format the finding for human-readable output.
    ///
    /// With a text position: `{file}:{line}:{column}: [{severity}] {message}`
    /// With a pointer: `{file}: [{severity}] {message} (at {pointer})`
    #[must_use]
    pub fn format_human_readable(&self, document: &Path) -> String {
        let rule = self
            .rule
            .as_deref()
            .map_or_else(String::new, |id| format!(" [{id}]"));
        match &self.location {
            Some(Location::Position { line, column }) => format!(
                "{}:{line}:{column}: [{}]{rule} {}",
                document.display(),
                self.severity,
                self.message
            ),
            Some(pointer @ Location::Pointer { .. }) => format!(
                "{}: [{}]{rule} {} (at {pointer})",
                document.display(),
                self.severity,
                self.message
            ),
            None => format!(
                "{}: [{}]{rule} {}",
                document.display(),
                self.severity,
                self.message
            ),
        }
    }
}

/// Outcome of a single validation stage.
///
/// A result is passing iff none of its findings reaches
/// [`Severity::FAILING_THRESHOLD`]; an empty result is passing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[non_exhaustive]
pub struct ValidationResult {
    /// Logical identity of the validated document.
    pub document: PathBuf,
    pub findings: Vec<Finding>,
}

impl ValidationResult {
    #[must_use]
    pub fn new(document: impl Into<PathBuf>) -> Self {
        Self {
            document: document.into(),
            findings: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_findings(document: impl Into<PathBuf>, findings: Vec<Finding>) -> Self {
        Self {
            document: document.into(),
            findings,
        }
    }

    pub fn push(&mut self, finding: Finding) {
        self.findings.push(finding);
    }

    #[must_use]
    pub fn is_passing(&self) -> bool {
        !self.findings.iter().any(|f| f.severity.is_failing())
    }

    #[must_use]
    pub fn highest_severity(&self) -> Option<Severity> {
        self.findings.iter().map(|f| f.severity).max()
    }

    /// Number of findings at or above the failing threshold.
    #[must_use]
    pub fn failing_count(&self) -> usize {
        self.findings
            .iter()
            .filter(|f| f.severity.is_failing())
            .count()
    }
}

/// Terminal outcome category of one pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Valid,
    SchemaInvalid,
    ConstraintInvalid,
    ProcessingError,
    ConfigurationError,
}

impl Verdict {
    /// Stable process exit code for the verdict.
    #[must_use]
    pub const fn exit_code(self) -> u8 {
        match self {
            Self::Valid => 0,
            Self::SchemaInvalid => 1,
            Self::ConstraintInvalid => 2,
            Self::ProcessingError => 3,
            Self::ConfigurationError => 4,
        }
    }

    #[must_use]
    pub const fn is_valid(self) -> bool {
        matches!(self, Self::Valid)
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Valid => "valid",
            Self::SchemaInvalid => "schema invalid",
            Self::ConstraintInvalid => "constraint invalid",
            Self::ProcessingError => "processing error",
            Self::ConfigurationError => "configuration error",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Everything a single pipeline run produced.
#[derive(Debug, Clone, Serialize)]
#[non_exhaustive]
pub struct ValidationOutcome {
    pub target: PathBuf,
    pub verdict: Verdict,
    /// Format the run resolved to; absent when resolution failed.
    pub format: Option<Format>,
    /// Schema stage result; absent when the stage did not complete.
    pub schema: Option<ValidationResult>,
    /// Constraint stage result; absent when the stage was skipped or did not complete.
    pub constraints: Option<ValidationResult>,
    /// Explanation for `ConfigurationError` and `ProcessingError` verdicts.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ValidationOutcome {
    pub(crate) fn new(target: impl Into<PathBuf>, verdict: Verdict) -> Self {
        Self {
            target: target.into(),
            verdict,
            format: None,
            schema: None,
            constraints: None,
            message: None,
        }
    }

    /// The result of the stage that decided the verdict, if any stage ran.
    #[must_use]
    pub fn deciding_result(&self) -> Option<&ValidationResult> {
        match self.verdict {
            Verdict::ConstraintInvalid | Verdict::Valid => {
                self.constraints.as_ref().or(self.schema.as_ref())
            }
            _ => self.schema.as_ref(),
        }
    }

    /// All findings from every stage that ran, in stage order.
    pub fn findings(&self) -> impl Iterator<Item = &Finding> {
        self.schema
            .iter()
            .chain(self.constraints.iter())
            .flat_map(|r| r.findings.iter())
    }
}
