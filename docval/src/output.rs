//! Shared output formatting for validation outcomes.
//!
//! Provides JSON and plain-text formatters for `ValidationOutcome`.
//! Color/terminal formatting belongs to the CLI layer.

use std::io::Write;

use crate::report::{ValidationOutcome, ValidationResult};

/// Format a `ValidationOutcome` as JSON to a writer.
///
/// # Errors
///
/// Returns an error if serialization or writing fails.
pub fn write_json(outcome: &ValidationOutcome, writer: &mut dyn Write) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(outcome)?;
    writeln!(writer, "{json}")?;
    Ok(())
}

fn write_section(
    writer: &mut dyn Write,
    title: &str,
    result: &ValidationResult,
) -> anyhow::Result<()> {
    if result.findings.is_empty() {
        return Ok(());
    }
    writeln!(writer, "{}", "-".repeat(80))?;
    writeln!(writer, "  {title}")?;
    writeln!(writer, "{}", "-".repeat(80))?;
    for finding in &result.findings {
        writeln!(writer, "{}", finding.format_human_readable(&result.document))?;
    }
    writeln!(writer)?;
    Ok(())
}

/// Format a `ValidationOutcome` as human-readable plain text to a writer.
///
/// # Errors
///
/// Returns an error if writing fails.
pub fn write_human(outcome: &ValidationOutcome, writer: &mut dyn Write) -> anyhow::Result<()> {
    writeln!(writer)?;
    writeln!(writer, "{}", "=".repeat(80))?;
    writeln!(writer, "  DOCUMENT VALIDATION")?;
    writeln!(writer, "{}", "=".repeat(80))?;
    writeln!(writer)?;
    writeln!(writer, "  Target:   {}", outcome.target.display())?;
    if let Some(format) = outcome.format {
        writeln!(writer, "  Format:   {format}")?;
    }
    writeln!(writer, "  Verdict:  {}", outcome.verdict)?;
    writeln!(writer)?;

    if let Some(schema) = &outcome.schema {
        write_section(writer, "SCHEMA FINDINGS", schema)?;
    }
    if let Some(constraints) = &outcome.constraints {
        write_section(writer, "CONSTRAINT FINDINGS", constraints)?;
    }

    writeln!(writer, "{}", "=".repeat(80))?;
    let target = outcome.target.display();
    match (&outcome.message, outcome.deciding_result()) {
        (Some(message), _) => writeln!(writer, "\u{2717} {message}")?,
        (None, _) if outcome.verdict.is_valid() => {
            writeln!(writer, "\u{2713} The file '{target}' is valid.")?;
        }
        (None, Some(result)) => writeln!(
            writer,
            "\u{2717} The file '{target}' is {}: {} failing finding(s)",
            outcome.verdict,
            result.failing_count()
        )?,
        (None, None) => writeln!(writer, "\u{2717} The file '{target}' is {}", outcome.verdict)?,
    }
    writeln!(writer, "{}", "=".repeat(80))?;

    Ok(())
}
