//! Bounded, scoped file reads shared by every stage.
//!
//! Each call opens the file, reads it and drops the handle before returning, on
//! every path. Reads go through `Read::take` so an oversized file is detected by
//! the same operation that reads it.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::error::ProcessingError;

/// Maximum size of a target document or schema source (64 MiB).
pub const MAX_FILE_SIZE: u64 = 67_108_864;

/// Read a file as raw bytes, enforcing `max_file_size`.
///
/// # Errors
///
/// Returns `ProcessingError::Io` if the file cannot be opened or read, and
/// `ProcessingError::TooLarge` if it exceeds `max_file_size`.
pub fn read_bytes_bounded(path: &Path, max_file_size: u64) -> Result<Vec<u8>, ProcessingError> {
    let file = File::open(path).map_err(|e| ProcessingError::io(path, e))?;

    // Read at most max_file_size + 1 bytes to detect oversized files
    let mut buffer = Vec::new();
    file.take(max_file_size.saturating_add(1))
        .read_to_end(&mut buffer)
        .map_err(|e| ProcessingError::io(path, e))?;

    if buffer.len() as u64 > max_file_size {
        return Err(ProcessingError::TooLarge {
            path: path.to_owned(),
            limit: max_file_size,
        });
    }
    Ok(buffer)
}

/// Read a file as UTF-8 text, enforcing `max_file_size`.
///
/// # Errors
///
/// Same as [`read_bytes_bounded`], plus `ProcessingError::InvalidEncoding` when
/// the content is not valid UTF-8.
pub fn read_file_bounded(path: &Path, max_file_size: u64) -> Result<String, ProcessingError> {
    let buffer = read_bytes_bounded(path, max_file_size)?;
    String::from_utf8(buffer).map_err(|_| ProcessingError::InvalidEncoding(path.to_owned()))
}

/// Read a document with the default size limit.
///
/// # Errors
///
/// See [`read_file_bounded`].
pub fn read_document(path: &Path) -> Result<String, ProcessingError> {
    read_file_bounded(path, MAX_FILE_SIZE)
}
