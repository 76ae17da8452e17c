//! Mounting and reading existing bundle archives.

use crate::error::{Error, Result};
use crate::utils::normalize_entry_path;
use camino::Utf8Path;
use std::collections::HashMap;
use std::fs::File;
use std::io::{Read, Seek};
use zip::ZipArchive;

/// A single entry in a mounted bundle.
#[derive(Debug, Clone)]
pub struct BundleEntry {
    /// Normalized entry path (forward slashes, lowercase).
    pub path: String,
    /// Uncompressed size in bytes.
    pub size: u64,
}

/// A mounted bundle archive.
///
/// Mounting enumerates the container's table of contents once; entry
/// payloads are read on demand through [`read_entry`](Self::read_entry).
/// Directory placeholders in the container are ignored. Two entries that
/// normalize to the same path are a [`DuplicateEntry`](Error::DuplicateEntry)
/// error — a well-formed base bundle never contains them, and silently
/// picking one would make merge results depend on container ordering.
#[derive(Debug)]
pub struct Bundle<R: Read + Seek> {
    archive: ZipArchive<R>,
    entries: Vec<BundleEntry>,
    index_by_path: HashMap<String, usize>,
}

impl Bundle<File> {
    /// Open and mount a bundle from a filesystem path.
    pub fn open(path: &Utf8Path) -> Result<Self> {
        let file = File::open(path.as_std_path())?;
        Self::mount(file)
    }
}

impl<R: Read + Seek> Bundle<R> {
    /// Mount a bundle from a reader.
    pub fn mount(reader: R) -> Result<Self> {
        let mut archive = ZipArchive::new(reader)?;

        let mut entries = Vec::with_capacity(archive.len());
        let mut index_by_path = HashMap::with_capacity(archive.len());

        for index in 0..archive.len() {
            let file = archive.by_index(index)?;
            if file.is_dir() {
                continue;
            }

            let path = normalize_entry_path(file.name());
            if path.is_empty() {
                continue;
            }

            if index_by_path.insert(path.clone(), index).is_some() {
                return Err(Error::DuplicateEntry(path));
            }

            entries.push(BundleEntry {
                path,
                size: file.size(),
            });
        }

        tracing::debug!("Mounted bundle with {} entries", entries.len());

        Ok(Self {
            archive,
            entries,
            index_by_path,
        })
    }

    /// All entries, in container order.
    pub fn entries(&self) -> &[BundleEntry] {
        &self.entries
    }

    /// Number of payload entries in the bundle.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the bundle contains no payload entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether the bundle contains an entry with the given normalized path.
    pub fn contains(&self, path: &str) -> bool {
        self.index_by_path.contains_key(path)
    }

    /// Read the full payload of the entry at the given normalized path.
    pub fn read_entry(&mut self, path: &str) -> Result<Vec<u8>> {
        let index = *self
            .index_by_path
            .get(path)
            .ok_or_else(|| Error::EntryNotFound(path.to_string()))?;

        let mut file = self.archive.by_index(index)?;
        let mut bytes = Vec::with_capacity(file.size() as usize);
        file.read_to_end(&mut bytes)?;
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::write::BundleWriter;
    use std::io::Cursor;

    fn build_test_bundle(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut writer = BundleWriter::new(Cursor::new(Vec::new()));
        for (path, bytes) in entries {
            writer.write_entry(path, bytes).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    #[test]
    fn test_mount_and_read() {
        let bytes = build_test_bundle(&[
            ("data/core.dat", b"core"),
            ("data/extra.dat", b"extra"),
        ]);

        let mut bundle = Bundle::mount(Cursor::new(bytes)).unwrap();
        assert_eq!(bundle.len(), 2);
        assert!(bundle.contains("data/core.dat"));
        assert_eq!(bundle.read_entry("data/core.dat").unwrap(), b"core");
        assert_eq!(bundle.read_entry("data/extra.dat").unwrap(), b"extra");
    }

    #[test]
    fn test_entry_paths_are_normalized() {
        let bytes = build_test_bundle(&[("Data/Core.DAT", b"core")]);

        let mut bundle = Bundle::mount(Cursor::new(bytes)).unwrap();
        assert!(bundle.contains("data/core.dat"));
        assert_eq!(bundle.read_entry("data/core.dat").unwrap(), b"core");
    }

    #[test]
    fn test_missing_entry() {
        let bytes = build_test_bundle(&[("data/core.dat", b"core")]);

        let mut bundle = Bundle::mount(Cursor::new(bytes)).unwrap();
        let err = bundle.read_entry("data/missing.dat").unwrap_err();
        assert!(matches!(err, Error::EntryNotFound(_)));
    }

    #[test]
    fn test_duplicate_entries_rejected() {
        // Same path with different casing collapses to one normalized path.
        let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
        let options = zip::write::SimpleFileOptions::default();
        zip.start_file("data/core.dat", options).unwrap();
        std::io::Write::write_all(&mut zip, b"a").unwrap();
        zip.start_file("DATA/CORE.DAT", options).unwrap();
        std::io::Write::write_all(&mut zip, b"b").unwrap();
        let bytes = zip.finish().unwrap().into_inner();

        let err = Bundle::mount(Cursor::new(bytes)).unwrap_err();
        assert!(matches!(err, Error::DuplicateEntry(_)));
    }

    #[test]
    fn test_mount_garbage_fails() {
        let result = Bundle::mount(Cursor::new(b"not a bundle".to_vec()));
        assert!(result.is_err());
    }
}
