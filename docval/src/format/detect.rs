//! Content-based format detection.
//!
//! Only the leading bytes of the target are inspected; the file extension is never
//! consulted, so an XML document named `data.json` is still detected as XML.

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::ConfigurationError;
use crate::format::{Format, FormatDetector};

/// Number of leading bytes inspected when sniffing.
pub const SNIFF_LIMIT: u64 = 4096;

/// A YAML block mapping entry: a plain or quoted key followed by `:` and a space or end of line.
static YAML_MAPPING_KEY: LazyLock<Regex> = LazyLock::new(|| {
    match Regex::new(concat!(
        r#"^(?:"[^"]*"|'[^']*'"#,         // quoted key
        r"|[^\s#:\[\]{},&*!|>%@`-][^#]*?", // plain key
        r"|-[^\s#][^#]*?)",               // plain key starting with '-' (e.g. -flag)
        r"\s*:(?:\s|$)",
    )) {
        Ok(regex) => regex,
        Err(err) => panic!("Invalid YAML key regex: {err}"),
    }
});

/// Detects the format from the leading content of the file.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContentSniffer;

impl FormatDetector for ContentSniffer {
    fn detect(&self, target: &Path) -> Result<Format, ConfigurationError> {
        let prefix = read_prefix(target)?;
        let format = sniff(&prefix)
            .ok_or_else(|| ConfigurationError::UnrecognizableFormat(target.to_owned()))?;
        tracing::debug!(path = %target.display(), %format, "detected document format");
        Ok(format)
    }
}

fn read_prefix(target: &Path) -> Result<Vec<u8>, ConfigurationError> {
    let unreadable = |source: io::Error| match source.kind() {
        io::ErrorKind::NotFound => ConfigurationError::MissingTarget(target.to_owned()),
        _ => ConfigurationError::UnreadableTarget {
            path: target.to_owned(),
            source,
        },
    };

    let file = File::open(target).map_err(unreadable)?;
    let mut buffer = Vec::new();
    file.take(SNIFF_LIMIT)
        .read_to_end(&mut buffer)
        .map_err(unreadable)?;
    Ok(buffer)
}

/// Classify a content prefix.
///
/// - `<` → XML
/// - `{` or `[` → JSON
/// - a `---` / `%YAML` marker, a `key:` mapping line or a `- ` sequence line → YAML
///
/// Leading whitespace, a UTF-8 BOM and, for YAML, `#` comment lines are skipped.
/// Returns `None` for empty or unrecognizable content.
#[must_use]
pub fn sniff(prefix: &[u8]) -> Option<Format> {
    let text = String::from_utf8_lossy(prefix);
    let text = text.strip_prefix('\u{feff}').unwrap_or(&*text);
    let trimmed = text.trim_start();

    match trimmed.chars().next()? {
        '<' => return Some(Format::Xml),
        '{' | '[' => return Some(Format::Json),
        _ => {}
    }

    let first_line = trimmed
        .lines()
        .map(str::trim_end)
        .find(|line| !line.trim().is_empty() && !line.trim_start().starts_with('#'))?;

    let is_yaml = first_line.starts_with("---")
        || first_line.starts_with("%YAML")
        || first_line == "-"
        || first_line.starts_with("- ")
        || YAML_MAPPING_KEY.is_match(first_line.trim_start());
    is_yaml.then_some(Format::Yaml)
}
