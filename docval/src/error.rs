//! Error taxonomy for a validation run.
//!
//! Two classes of failure stop a run before a verdict about the document can be
//! reached:
//!
//! - [`ConfigurationError`]: the input to the run is wrong (missing target, bad
//!   `--as` value, unrecognizable content, unusable configuration). Detected
//!   before any validation stage executes.
//! - [`ProcessingError`]: a stage could not complete for reasons unrelated to the
//!   document's validity (I/O failure, unreadable schema, syntax the parser for the
//!   resolved format rejects).
//!
//! Schema and constraint violations are not errors; they are findings in a
//! [`ValidationResult`](crate::ValidationResult).

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::format::Format;
use crate::report::Location;

/// Bad or missing input, detected before any validation stage runs.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigurationError {
    /// No target was supplied.
    #[error("The source to validate must be provided.")]
    MissingSource,
    /// The target path does not exist.
    #[error("The provided target file '{}' does not exist.", .0.display())]
    MissingTarget(PathBuf),
    /// The target exists but cannot be opened for reading.
    #[error("The provided target file '{}' is not readable.", .path.display())]
    UnreadableTarget {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// The target is a directory or another non-regular file.
    #[error("The provided target '{}' is not a regular file.", .0.display())]
    NotAFile(PathBuf),
    /// The `--as` hint is not one of the supported formats.
    #[error(
        "Invalid '--as' argument '{value}'. The format must be one of: {options}",
        options = Format::options()
    )]
    InvalidFormatArgument { value: String },
    /// No hint was given and the content matches no known format.
    #[error(
        "Target file '{}' has unrecognizable format. Use '--as' to specify the format. The format must be one of: {options}",
        .0.display(),
        options = Format::options()
    )]
    UnrecognizableFormat(PathBuf),
    /// No schema strategy is registered for the resolved format.
    #[error("Unsupported format: {0} (no schema is configured for it)")]
    UnsupportedFormat(Format),
    /// The validator configuration could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Failure to load configuration or constraint rule files.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("failed to read '{}': {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse '{}': {message}", .path.display())]
    Parse { path: PathBuf, message: String },
    #[error("invalid constraint rule '{id}' in '{}': {message}", .path.display())]
    InvalidRule {
        path: PathBuf,
        id: String,
        message: String,
    },
}

/// A validation stage could not complete.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProcessingError {
    /// Opening or reading a file failed.
    #[error("I/O error reading '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// A file exceeded the read limit.
    #[error("'{}' exceeds the maximum size of {limit} bytes", .path.display())]
    TooLarge { path: PathBuf, limit: u64 },
    /// A file is not valid UTF-8.
    #[error("'{}' is not valid UTF-8", .0.display())]
    InvalidEncoding(PathBuf),
    /// A schema source could not be read or compiled.
    #[error("unable to load schema '{}': {message}", .path.display())]
    SchemaResource { path: PathBuf, message: String },
    /// The document is not syntactically valid in the resolved format.
    #[error("{format} parse error in '{}': {message}", .path.display())]
    Parse {
        path: PathBuf,
        format: Format,
        message: String,
        location: Option<Location>,
    },
}

impl ProcessingError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Source location of a parse failure, when the parser reported one.
    #[must_use]
    pub fn location(&self) -> Option<&Location> {
        match self {
            Self::Parse { location, .. } => location.as_ref(),
            _ => None,
        }
    }
}
