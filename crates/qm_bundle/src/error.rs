//! Error types for bundle operations.

use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while reading or writing a bundle archive.
#[derive(Error, Debug)]
pub enum Error {
    /// Filesystem I/O failed (opening, reading or writing archive data).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The underlying zip container is malformed or could not be written.
    #[error("archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// Two archive entries normalize to the same path.
    #[error("duplicate bundle entry: {0}")]
    DuplicateEntry(String),

    /// An entry path was requested that the bundle does not contain.
    #[error("bundle entry not found: {0}")]
    EntryNotFound(String),
}
