//! Entry-path normalization and content hashing.

use crate::error::Result;
use camino::Utf8Path;
use std::io::Read;
use xxhash_rust::xxh3::{xxh3_64, Xxh3};

/// Normalize a bundle entry path for comparison and hashing.
///
/// Backslashes become forward slashes, leading/trailing separators are
/// stripped, and the path is lowercased. The Emberfall runtime resolves
/// entries case-insensitively, so two entries differing only in case are the
/// same entry as far as the game is concerned.
pub fn normalize_entry_path(raw: &str) -> String {
    raw.replace('\\', "/")
        .trim_matches('/')
        .to_ascii_lowercase()
}

/// xxHash3 of a byte slice. Used for per-entry content hashes.
pub fn hash_bytes(bytes: &[u8]) -> u64 {
    xxh3_64(bytes)
}

/// xxHash3 of a file's contents, streamed in 64 KiB blocks.
///
/// Used for whole-bundle hashes: the base bundle hash that feeds the build
/// fingerprint, and the post-write verification hash of a rebuilt bundle.
pub fn hash_file(path: &Utf8Path) -> Result<u64> {
    let mut file = std::fs::File::open(path.as_std_path())?;
    let mut hasher = Xxh3::new();
    let mut buf = [0u8; 64 * 1024];

    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }

    Ok(hasher.digest())
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino::Utf8Path;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_normalize_backslashes() {
        assert_eq!(
            normalize_entry_path("Data\\Armor\\Heavy.tex"),
            "data/armor/heavy.tex"
        );
    }

    #[test]
    fn test_normalize_strips_separators() {
        assert_eq!(normalize_entry_path("/data/core.dat/"), "data/core.dat");
    }

    #[test]
    fn test_normalize_idempotent() {
        let once = normalize_entry_path("Data/Core.DAT");
        assert_eq!(normalize_entry_path(&once), once);
    }

    #[test]
    fn test_hash_file_matches_hash_bytes() {
        let mut temp = NamedTempFile::new().unwrap();
        temp.write_all(b"bundle contents").unwrap();
        temp.flush().unwrap();

        let path = Utf8Path::from_path(temp.path()).unwrap();
        assert_eq!(hash_file(path).unwrap(), hash_bytes(b"bundle contents"));
    }
}
