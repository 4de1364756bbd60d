//! Document formats and format resolution.
//!
//! - `detect`: content-based format sniffing
//! - `json`: JSON document loading
//! - `xml`: XML element tree parsing (shared by the XSD engine and the constraint model)
//! - `yaml`: YAML normalization into a JSON value tree

pub mod detect;
pub mod json;
pub mod xml;
pub mod yaml;

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::Serialize;

use crate::error::ConfigurationError;

/// Serialization format of a document. Resolved once per run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    Xml,
    Json,
    Yaml,
}

impl Format {
    pub const ALL: [Self; 3] = [Self::Xml, Self::Json, Self::Yaml];

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Xml => "XML",
            Self::Json => "JSON",
            Self::Yaml => "YAML",
        }
    }

    /// The supported formats joined with an Oxford comma: `XML, JSON, and YAML`.
    #[must_use]
    pub fn options() -> String {
        let names: Vec<&str> = Self::ALL.into_iter().map(Self::name).collect();
        match names.as_slice() {
            [] => String::new(),
            [only] => (*only).to_owned(),
            [first, second] => format!("{first} and {second}"),
            [init @ .., last] => format!("{}, and {last}", init.join(", ")),
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Format {
    type Err = ConfigurationError;

    /// Case-insensitive parse of `xml`, `json` or `yaml`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|f| f.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| ConfigurationError::InvalidFormatArgument {
                value: s.to_owned(),
            })
    }
}

/// Determines the format of a target document when no hint is given.
pub trait FormatDetector {
    /// Detect the format of `target`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError::MissingTarget` or `UnreadableTarget` when the
    /// file cannot be opened, and `UnrecognizableFormat` when no format applies.
    fn detect(&self, target: &Path) -> Result<Format, ConfigurationError>;
}

/// Resolve the run's format: a hint always wins, detection runs only without one.
///
/// # Errors
///
/// Returns `ConfigurationError::InvalidFormatArgument` for an unknown hint, or
/// whatever the detector reports when no hint is given.
pub fn resolve_format(
    hint: Option<&str>,
    target: &Path,
    detector: &dyn FormatDetector,
) -> Result<Format, ConfigurationError> {
    match hint {
        Some(text) => text.parse(),
        None => detector.detect(target),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::path::PathBuf;

    /// Detector that never touches the filesystem and counts its calls.
    struct FakeDetector {
        answer: Option<Format>,
        calls: Cell<usize>,
    }

    impl FakeDetector {
        fn new(answer: Option<Format>) -> Self {
            Self {
                answer,
                calls: Cell::new(0),
            }
        }
    }

    impl FormatDetector for FakeDetector {
        fn detect(&self, target: &Path) -> Result<Format, ConfigurationError> {
            self.calls.set(self.calls.get() + 1);
            self.answer
                .ok_or_else(|| ConfigurationError::UnrecognizableFormat(target.to_owned()))
        }
    }

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!("xml".parse::<Format>().unwrap(), Format::Xml);
        assert_eq!("JSON".parse::<Format>().unwrap(), Format::Json);
        assert_eq!("YaMl".parse::<Format>().unwrap(), Format::Yaml);
    }

    #[test]
    fn test_parse_rejects_unknown() {
        for bad in ["yml", "toml", "", " xml"] {
            let err = bad.parse::<Format>().unwrap_err();
            assert!(
                matches!(err, ConfigurationError::InvalidFormatArgument { .. }),
                "{bad:?} -> {err:?}"
            );
        }
    }

    #[test]
    fn test_options_oxford_comma() {
        assert_eq!(Format::options(), "XML, JSON, and YAML");
    }

    #[test]
    fn test_hint_overrides_detection() {
        let detector = FakeDetector::new(Some(Format::Xml));
        let format = resolve_format(Some("yaml"), &PathBuf::from("a.xml"), &detector).unwrap();
        assert_eq!(format, Format::Yaml);
        assert_eq!(detector.calls.get(), 0);
    }

    #[test]
    fn test_invalid_hint_never_detects() {
        let detector = FakeDetector::new(Some(Format::Json));
        let err = resolve_format(Some("csv"), &PathBuf::from("a.json"), &detector).unwrap_err();
        assert!(matches!(err, ConfigurationError::InvalidFormatArgument { .. }));
        assert_eq!(detector.calls.get(), 0);
    }

    #[test]
    fn test_detection_without_hint() {
        let detector = FakeDetector::new(Some(Format::Json));
        let format = resolve_format(None, &PathBuf::from("a"), &detector).unwrap();
        assert_eq!(format, Format::Json);
        assert_eq!(detector.calls.get(), 1);
    }

    #[test]
    fn test_detection_failure_propagates() {
        let detector = FakeDetector::new(None);
        let err = resolve_format(None, &PathBuf::from("a"), &detector).unwrap_err();
        assert!(matches!(err, ConfigurationError::UnrecognizableFormat(_)));
    }
}
