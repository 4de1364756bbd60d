//! JSON document loading.

use std::path::Path;

use serde_json::Value;

use crate::error::ProcessingError;
use crate::format::Format;
use crate::fs::read_document;
use crate::report::Location;

/// Parse JSON text into a value tree.
///
/// # Errors
///
/// Returns `ProcessingError::Parse` with the line and column of the syntax error.
/// Invalid JSON is never silently treated as an empty document.
pub fn parse_json_str(content: &str, document: &Path) -> Result<Value, ProcessingError> {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);
    serde_json::from_str(content).map_err(|e| ProcessingError::Parse {
        path: document.to_owned(),
        format: Format::Json,
        message: e.to_string(),
        location: Some(Location::Position {
            line: e.line(),
            column: e.column(),
        }),
    })
}

/// Read and parse a JSON file.
///
/// # Errors
///
/// Returns a `ProcessingError` if the file cannot be read or is not valid JSON.
pub fn read_json(path: &Path) -> Result<Value, ProcessingError> {
    let content = read_document(path)?;
    parse_json_str(&content, path)
}
