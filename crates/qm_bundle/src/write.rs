//! Deterministic bundle writing.

use crate::error::{Error, Result};
use crate::utils::normalize_entry_path;
use std::collections::HashSet;
use std::io::{Seek, Write};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Writes a new bundle archive.
///
/// Entry paths are normalized on write and duplicates are rejected. All
/// entries are deflated with a fixed timestamp so that writing the same
/// entries in the same order always produces byte-identical output — the
/// rebuild pipeline's determinism guarantee rests on this.
pub struct BundleWriter<W: Write + Seek> {
    zip: ZipWriter<W>,
    written: HashSet<String>,
}

impl<W: Write + Seek> BundleWriter<W> {
    /// Create a writer emitting into `writer`.
    pub fn new(writer: W) -> Self {
        Self {
            zip: ZipWriter::new(writer),
            written: HashSet::new(),
        }
    }

    /// Append one entry. `path` is normalized before writing.
    pub fn write_entry(&mut self, path: &str, bytes: &[u8]) -> Result<()> {
        let path = normalize_entry_path(path);
        if !self.written.insert(path.clone()) {
            return Err(Error::DuplicateEntry(path));
        }

        // Fixed timestamp: archive bytes must not depend on the wall clock.
        let options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .last_modified_time(zip::DateTime::default())
            .unix_permissions(0o644);

        self.zip.start_file(path, options)?;
        self.zip.write_all(bytes)?;
        Ok(())
    }

    /// Number of entries written so far.
    pub fn entry_count(&self) -> usize {
        self.written.len()
    }

    /// Finish the archive and return the underlying writer.
    pub fn finish(self) -> Result<W> {
        Ok(self.zip.finish()?)
    }
}
