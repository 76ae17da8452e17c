//! Build state persistence for rebuild caching.
//!
//! After a successful, verified rebuild, a [`BuildState`] is serialized next
//! to the live bundle. On the next launch the pipeline loads this record and
//! compares fingerprints; on a match (with the live bundle still on disk)
//! the entire rebuild is skipped.
//!
//! The record is deliberately simple — it tracks *what* was built, not
//! *how*. Any mismatch triggers a full rebuild. Loading is deliberately
//! forgiving: a missing, unreadable or corrupt record is "no prior state",
//! never an error, because the worst that costs is one redundant rebuild.
//! Saving is atomic (temp file + rename) so a crash mid-write leaves either
//! the old record or the new one, never a corrupt hybrid.

use crate::error::Result;
use crate::inventory::ModPackage;
use camino::Utf8Path;
use serde::{Deserialize, Serialize};

/// Current state record schema version.
const STATE_VERSION: u32 = 1;

/// The identity of one enabled mod at the time of a build.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ModStamp {
    pub id: String,
    pub version: String,
    pub content_hash: u64,
}

impl From<&ModPackage> for ModStamp {
    fn from(package: &ModPackage) -> Self {
        Self {
            id: package.id.clone(),
            version: package.version.clone(),
            content_hash: package.content_hash,
        }
    }
}

/// Snapshot of the last successful build, persisted as JSON.
///
/// # JSON format
///
/// ```json
/// {
///   "version": 1,
///   "fingerprint": 1234567890,
///   "baseHash": 987654321,
///   "enabledMods": [
///     { "id": "crimson_armory", "version": "1.2.0", "contentHash": 42 }
///   ]
/// }
/// ```
///
/// Only `version` and `fingerprint` drive the reuse decision; the base hash
/// and mod stamps are recorded so a status display can explain *why* a
/// rebuild is needed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildState {
    /// Schema version (current: `1`).
    pub version: u32,

    /// Fingerprint of the inputs that produced the live bundle.
    pub fingerprint: u64,

    /// Content hash of the base bundle at build time.
    pub base_hash: u64,

    /// Ordered stamps of the enabled mods at build time.
    pub enabled_mods: Vec<ModStamp>,
}

impl BuildState {
    /// Create a new state record.
    pub fn new(fingerprint: u64, base_hash: u64, enabled_mods: Vec<ModStamp>) -> Self {
        Self {
            version: STATE_VERSION,
            fingerprint,
            base_hash,
            enabled_mods,
        }
    }

    /// Load the state record at `path`, trusting it only if the rebuilt
    /// bundle it describes still exists at `bundle_path`.
    ///
    /// Returns `None` for a missing, unreadable or unparseable record, and
    /// for a record whose bundle is gone — all of these simply mean "rebuild
    /// required".
    pub fn load(path: &Utf8Path, bundle_path: &Utf8Path) -> Option<Self> {
        if !path.as_std_path().exists() {
            return None;
        }

        let contents = match std::fs::read_to_string(path.as_std_path()) {
            Ok(c) => c,
            Err(e) => {
                tracing::warn!("Failed to read state record '{}': {}", path, e);
                return None;
            }
        };

        let state: Self = match serde_json::from_str(&contents) {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!("Discarding corrupt state record '{}': {}", path, e);
                return None;
            }
        };

        if !bundle_path.as_std_path().exists() {
            tracing::info!(
                "State record '{}' describes a missing bundle '{}'; ignoring it",
                path,
                bundle_path
            );
            return None;
        }

        Some(state)
    }

    /// Save the state record to `path`, atomically replacing any previous
    /// record. Creates parent directories if needed.
    pub fn save(&self, path: &Utf8Path) -> Result<()> {
        let parent = path.parent().unwrap_or(Utf8Path::new("."));
        std::fs::create_dir_all(parent.as_std_path())?;

        let contents = serde_json::to_string_pretty(self)?;
        let mut temp = tempfile::NamedTempFile::new_in(parent.as_std_path())?;
        std::io::Write::write_all(&mut temp, contents.as_bytes())?;
        temp.persist(path.as_std_path())
            .map_err(|e| e.error)?;

        Ok(())
    }

    /// Whether this record matches the given current fingerprint.
    pub fn matches(&self, fingerprint: u64) -> bool {
        self.version == STATE_VERSION && self.fingerprint == fingerprint
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino::Utf8PathBuf;
    use std::fs;
    use tempfile::tempdir;

    fn stamp(id: &str) -> ModStamp {
        ModStamp {
            id: id.to_string(),
            version: "1.0.0".to_string(),
            content_hash: 7,
        }
    }

    fn fixture() -> (tempfile::TempDir, Utf8PathBuf, Utf8PathBuf) {
        let dir = tempdir().unwrap();
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
        let state_path = root.join("live.bundle.state.json");
        let bundle_path = root.join("live.bundle");
        fs::write(bundle_path.as_std_path(), b"bundle").unwrap();
        (dir, state_path, bundle_path)
    }

    #[test]
    fn test_save_and_load() {
        let (_guard, state_path, bundle_path) = fixture();

        let state = BuildState::new(0x123456, 0xABC, vec![stamp("a"), stamp("b")]);
        state.save(&state_path).unwrap();

        let loaded = BuildState::load(&state_path, &bundle_path).unwrap();
        assert_eq!(loaded.version, STATE_VERSION);
        assert_eq!(loaded.fingerprint, 0x123456);
        assert_eq!(loaded.base_hash, 0xABC);
        assert_eq!(loaded.enabled_mods, state.enabled_mods);
    }

    #[test]
    fn test_load_missing_record() {
        let (_guard, state_path, bundle_path) = fixture();
        assert!(BuildState::load(&state_path, &bundle_path).is_none());
    }

    #[test]
    fn test_load_corrupt_record_is_none() {
        let (_guard, state_path, bundle_path) = fixture();
        fs::write(state_path.as_std_path(), b"{ corrupt").unwrap();

        assert!(BuildState::load(&state_path, &bundle_path).is_none());
    }

    #[test]
    fn test_load_distrusts_missing_bundle() {
        let (_guard, state_path, bundle_path) = fixture();

        let state = BuildState::new(1, 2, vec![]);
        state.save(&state_path).unwrap();

        fs::remove_file(bundle_path.as_std_path()).unwrap();
        assert!(BuildState::load(&state_path, &bundle_path).is_none());
    }

    #[test]
    fn test_matches() {
        let state = BuildState::new(0x123456, 0, vec![]);
        assert!(state.matches(0x123456));
        assert!(!state.matches(0x654321));
    }

    #[test]
    fn test_stale_schema_version_never_matches() {
        let mut state = BuildState::new(0x123456, 0, vec![]);
        state.version = 0;
        assert!(!state.matches(0x123456));
    }

    #[test]
    fn test_save_replaces_existing() {
        let (_guard, state_path, bundle_path) = fixture();

        BuildState::new(1, 0, vec![]).save(&state_path).unwrap();
        BuildState::new(2, 0, vec![]).save(&state_path).unwrap();

        let loaded = BuildState::load(&state_path, &bundle_path).unwrap();
        assert_eq!(loaded.fingerprint, 2);
    }

    #[test]
    fn test_serialization_format() {
        let state = BuildState::new(0x123456, 1, vec![stamp("a")]);
        let json = serde_json::to_string(&state).unwrap();

        assert!(json.contains("\"version\":1"));
        assert!(json.contains("\"fingerprint\""));
        assert!(json.contains("\"baseHash\""));
        assert!(json.contains("\"enabledMods\""));
        assert!(json.contains("\"contentHash\""));
    }
}
