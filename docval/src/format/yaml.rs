//! YAML normalization.
//!
//! YAML is deserialized straight into `serde_json::Value`, so downstream schema
//! validation sees the same value model it would for the equivalent JSON text.
//! Objects, arrays, strings, numbers, booleans and null convert losslessly; YAML-only
//! values outside that intersection (non-string keys, non-finite floats) are
//! rejected or mapped the way `serde_json` maps them.

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use crate::error::ProcessingError;
use crate::format::Format;
use crate::fs::read_document;
use crate::report::Location;

/// Pulls a `line N, column M` position out of a parser message.
static LINE_COLUMN: LazyLock<Regex> = LazyLock::new(|| {
    match Regex::new(r"(?i)line\s+(\d+)\D{1,12}?column\s+(\d+)") {
        Ok(regex) => regex,
        Err(err) => panic!("Invalid line/column regex: {err}"),
    }
});

fn location_in(message: &str) -> Option<Location> {
    let captures = LINE_COLUMN.captures(message)?;
    let line = captures.get(1)?.as_str().parse().ok()?;
    let column = captures.get(2)?.as_str().parse().ok()?;
    Some(Location::Position { line, column })
}

fn parse_error(document: &Path, message: String) -> ProcessingError {
    ProcessingError::Parse {
        path: document.to_owned(),
        format: Format::Yaml,
        location: location_in(&message),
        message,
    }
}

/// Normalize YAML text into a JSON-equivalent value tree.
///
/// The content must hold a single document; an empty stream normalizes to `null`.
///
/// # Errors
///
/// Returns `ProcessingError::Parse` when the YAML is syntactically invalid, when a
/// node has no JSON equivalent, or when the stream holds more than one document.
pub fn normalize_yaml_str(content: &str, document: &Path) -> Result<Value, ProcessingError> {
    let mut documents: Vec<Value> =
        serde_saphyr::from_multiple(content).map_err(|e| parse_error(document, e.to_string()))?;

    match documents.len() {
        0 => Ok(Value::Null),
        1 => Ok(documents.swap_remove(0)),
        count => Err(parse_error(
            document,
            format!("expected a single YAML document, found {count}"),
        )),
    }
}

/// Read a YAML file and normalize it into a JSON-equivalent value tree.
///
/// # Errors
///
/// Returns a `ProcessingError` if the file cannot be read or normalized.
pub fn normalize_yaml(path: &Path) -> Result<Value, ProcessingError> {
    let content = read_document(path)?;
    let value = normalize_yaml_str(&content, path)?;
    tracing::debug!(path = %path.display(), "normalized YAML document");
    Ok(value)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::format::json::parse_json_str;
    use serde_json::json;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn normalize(content: &str) -> Result<Value, ProcessingError> {
        normalize_yaml_str(content, Path::new("test.yaml"))
    }

    #[test]
    fn test_normalize_mapping() {
        let value = normalize("name: catalog\ncount: 3\nenabled: true\nratio: 0.5\nnothing: null\n")
            .unwrap();
        assert_eq!(
            value,
            json!({"name": "catalog", "count": 3, "enabled": true, "ratio": 0.5, "nothing": null})
        );
    }

    #[test]
    fn test_normalize_nested_sequences() {
        let value = normalize("books:\n  - id: b1\n    tags: [a, b]\n  - id: b2\n").unwrap();
        assert_eq!(
            value,
            json!({"books": [{"id": "b1", "tags": ["a", "b"]}, {"id": "b2"}]})
        );
    }

    #[test]
    fn test_normalize_matches_equivalent_json() {
        let yaml = normalize("a:\n  b: [1, 2]\n  c: \"text\"\n").unwrap();
        let json = parse_json_str(r#"{"a": {"b": [1, 2], "c": "text"}}"#, Path::new("a.json"))
            .unwrap();
        assert_eq!(yaml, json);
    }

    #[test]
    fn test_json_text_is_valid_yaml() {
        let value = normalize(r#"{"a": [1, 2], "b": {"c": null}}"#).unwrap();
        assert_eq!(value, json!({"a": [1, 2], "b": {"c": null}}));
    }

    #[test]
    fn test_invalid_yaml_is_parse_error() {
        let err = normalize(": : :\n  - [unclosed\n").unwrap_err();
        match err {
            ProcessingError::Parse {
                format, message, ..
            } => {
                assert_eq!(format, Format::Yaml);
                assert!(!message.is_empty());
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_multiple_documents_rejected() {
        let err = normalize("a: 1\n---\nb: 2\n").unwrap_err();
        assert!(
            err.to_string().contains("single YAML document"),
            "got: {err}"
        );
    }

    #[test]
    fn test_location_extracted_from_message() {
        assert_eq!(
            location_in("did not find expected key at line 3, column 7"),
            Some(Location::Position { line: 3, column: 7 })
        );
        assert_eq!(location_in("no position here"), None);
    }

    #[test]
    fn test_normalize_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"- 1\n- 2\n").unwrap();
        assert_eq!(normalize_yaml(file.path()).unwrap(), json!([1, 2]));
    }
}
