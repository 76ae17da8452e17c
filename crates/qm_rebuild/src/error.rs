//! Error types for rebuild operations.
//!
//! All fallible functions in this crate return [`Result<T>`], which uses
//! [`Error`] as the error type. External error types (`std::io::Error`,
//! `serde_json::Error`, bundle errors) are automatically converted via
//! `From` impls.
//!
//! Only conditions that abort an entire build are represented here.
//! Per-item failures — a malformed mod package, an unreadable mod entry —
//! are reported through the scan inventory and the merge report instead,
//! and never abort a build on their own.

use camino::Utf8PathBuf;
use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while rebuilding the live bundle.
#[derive(Error, Debug)]
pub enum Error {
    /// Filesystem I/O failed (scanning mods, reading or writing bundles).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to parse or serialize JSON (state record, mod manifest).
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Error from the `qm_bundle` crate when mounting or writing a bundle.
    #[error("bundle error: {0}")]
    Bundle(#[from] qm_bundle::Error),

    /// A zip-packaged mod's container is malformed.
    #[error("archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// The mods directory does not exist or is not a directory.
    #[error("invalid mods directory: {0}")]
    InvalidModsDir(Utf8PathBuf),

    /// The pristine base bundle is missing or cannot be mounted.
    /// Nothing can be rebuilt without it.
    #[error("base bundle unreadable '{path}': {reason}")]
    BaseBundleUnreadable { path: Utf8PathBuf, reason: String },

    /// The rebuilt bundle could not be written or moved into place.
    /// The previous destination, if any, is left untouched.
    #[error("destination unwritable '{path}': {reason}")]
    DestinationUnwritable { path: Utf8PathBuf, reason: String },

    /// The destination's hash after writing does not match the hash of the
    /// bundle that was just produced. The destination must not be trusted
    /// and no state is recorded.
    #[error(
        "verification failed for '{path}': expected {expected:016x}, found {actual:016x}"
    )]
    VerificationFailed {
        path: Utf8PathBuf,
        expected: u64,
        actual: u64,
    },

    /// Catch-all for errors from content providers and other sources.
    #[error("{0}")]
    Other(String),
}

impl From<String> for Error {
    fn from(s: String) -> Self {
        Error::Other(s)
    }
}
