//! Reporting of failing stage results.

use std::fmt;

use crate::report::{Severity, ValidationResult};

/// The validation stage a result came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Schema,
    Constraint,
}

impl Stage {
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Schema => "schema",
            Self::Constraint => "constraint",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Receives the result of a failing stage before the pipeline returns its verdict.
pub trait ResultReporter {
    fn report(&self, stage: Stage, result: &ValidationResult);
}

/// Logs a header line and every finding through `tracing`, at the level matching
/// the finding's severity.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingReporter;

impl ResultReporter for LoggingReporter {
    fn report(&self, stage: Stage, result: &ValidationResult) {
        tracing::info!(
            "The file '{}' has {stage} validation issue(s). The issues are:",
            result.document.display()
        );
        for finding in &result.findings {
            let line = finding.format_human_readable(&result.document);
            match finding.severity {
                Severity::Critical | Severity::Error => tracing::error!("{line}"),
                Severity::Warning => tracing::warn!("{line}"),
                Severity::Informational => tracing::info!("{line}"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_names() {
        assert_eq!(Stage::Schema.to_string(), "schema");
        assert_eq!(Stage::Constraint.to_string(), "constraint");
    }

    #[test]
    fn test_logging_reporter_accepts_every_severity() {
        let mut result = ValidationResult::new("doc.json");
        for severity in [
            Severity::Informational,
            Severity::Warning,
            Severity::Error,
            Severity::Critical,
        ] {
            result.push(crate::report::Finding::new(severity, "issue"));
        }
        LoggingReporter.report(Stage::Constraint, &result);
    }
}
