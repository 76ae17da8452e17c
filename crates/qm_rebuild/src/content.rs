//! Mod content provider abstraction.
//!
//! This module defines the [`ModContent`] trait that decouples the rebuild
//! pipeline from any particular mod storage format. Implementations provide
//! access to:
//!
//! - The mod's manifest, when it carries one
//! - The bundle entry paths the mod contributes
//! - The payload bytes for each entry
//!
//! Two implementations ship here: [`DirModContent`] for unpacked directory
//! mods and [`ZipModContent`] for `.zip`-packaged mods. Archive mods may
//! omit the manifest entirely (the legacy package format), in which case
//! [`manifest`](ModContent::manifest) returns `Ok(None)` and the scanner
//! derives an identity from the file name.

use crate::error::{Error, Result};
use camino::Utf8PathBuf;
use qm_bundle::normalize_entry_path;
use qm_manifest::{ModManifest, MANIFEST_JSON, MANIFEST_TOML};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use walkdir::WalkDir;
use zip::ZipArchive;

/// Directory inside a mod package that holds its bundle entries.
///
/// Everything under it is merged into the rebuilt bundle at its
/// package-relative path; everything outside it (manifest, readme,
/// thumbnails) is metadata the merge never touches.
pub const CONTENT_DIR: &str = "content";

/// Abstracts how mod content is accessed during a rebuild.
///
/// Implementations must be [`Send`] so a scan can process packages in
/// parallel. Methods take `&mut self` to allow stateful readers (e.g.
/// seeking within an archive).
///
/// Entry paths returned by [`entry_paths`](Self::entry_paths) are normalized
/// bundle paths (forward slashes, lowercase) in the mod's declared order —
/// lexicographic over the normalized paths, so a package lists its entries
/// identically on every filesystem and platform.
pub trait ModContent: Send {
    /// Return the mod's manifest, or `Ok(None)` if the package does not
    /// carry one. A present-but-invalid manifest is an error.
    fn manifest(&mut self) -> Result<Option<ModManifest>>;

    /// List the bundle entry paths this mod contributes, in declared order.
    fn entry_paths(&mut self) -> Result<Vec<String>>;

    /// Read the full payload of one entry by its normalized path.
    fn read_entry(&mut self, path: &str) -> Result<Vec<u8>>;
}

/// Filesystem-backed mod content provider.
///
/// Reads mod content from the standard unpacked layout:
///
/// ```text
/// mod_dir/
///   mod.manifest.json            # Identity, enabled flag, load order
///   content/
///     data/
///       armor/
///         heavy.tex              # Entry path = data/armor/heavy.tex
/// ```
pub struct DirModContent {
    mod_dir: Utf8PathBuf,
    // Normalized entry path -> absolute file path, filled on first listing.
    entry_map: Option<BTreeMap<String, Utf8PathBuf>>,
}

impl DirModContent {
    /// Create a provider rooted at the given mod directory.
    pub fn new(mod_dir: Utf8PathBuf) -> Self {
        Self {
            mod_dir,
            entry_map: None,
        }
    }

    fn ensure_entry_map(&mut self) -> Result<&BTreeMap<String, Utf8PathBuf>> {
        if self.entry_map.is_none() {
            let content_dir = self.mod_dir.join(CONTENT_DIR);
            let mut map = BTreeMap::new();

            if content_dir.as_std_path().is_dir() {
                for entry in WalkDir::new(content_dir.as_std_path()) {
                    let entry = entry.map_err(|e| Error::Other(e.to_string()))?;
                    if !entry.file_type().is_file() {
                        continue;
                    }

                    let path = match Utf8PathBuf::from_path_buf(entry.path().to_path_buf()) {
                        Ok(p) => p,
                        Err(p) => {
                            tracing::warn!("Skipping non-UTF-8 path: {}", p.display());
                            continue;
                        }
                    };

                    let rel = path.strip_prefix(&content_dir).unwrap_or(&path);
                    map.insert(normalize_entry_path(rel.as_str()), path.clone());
                }
            }

            self.entry_map = Some(map);
        }

        Ok(self.entry_map.as_ref().unwrap())
    }
}

impl ModContent for DirModContent {
    fn manifest(&mut self) -> Result<Option<ModManifest>> {
        let json_path = self.mod_dir.join(MANIFEST_JSON);
        if json_path.as_std_path().is_file() {
            let contents = std::fs::read_to_string(json_path.as_std_path())?;
            let manifest = ModManifest::from_json_str(&contents)
                .map_err(|e| Error::Other(format!("invalid {}: {}", MANIFEST_JSON, e)))?;
            return Ok(Some(manifest));
        }

        let toml_path = self.mod_dir.join(MANIFEST_TOML);
        if toml_path.as_std_path().is_file() {
            let contents = std::fs::read_to_string(toml_path.as_std_path())?;
            let manifest = ModManifest::from_toml_str(&contents)
                .map_err(|e| Error::Other(format!("invalid {}: {}", MANIFEST_TOML, e)))?;
            return Ok(Some(manifest));
        }

        Ok(None)
    }

    fn entry_paths(&mut self) -> Result<Vec<String>> {
        Ok(self.ensure_entry_map()?.keys().cloned().collect())
    }

    fn read_entry(&mut self, path: &str) -> Result<Vec<u8>> {
        let file_path = self
            .ensure_entry_map()?
            .get(path)
            .cloned()
            .ok_or_else(|| Error::Other(format!("mod entry not found: {}", path)))?;
        Ok(std::fs::read(file_path.as_std_path())?)
    }
}

/// Zip-archive-backed mod content provider.
///
/// The archive mirrors the unpacked layout: an optional manifest at the
/// root and payload files under `content/`.
pub struct ZipModContent {
    archive: ZipArchive<File>,
    // Normalized entry path -> archive index.
    entry_map: BTreeMap<String, usize>,
    // Archive index of the manifest, if present.
    manifest_index: Option<(usize, ManifestFlavor)>,
}

#[derive(Clone, Copy)]
enum ManifestFlavor {
    Json,
    Toml,
}

impl ZipModContent {
    /// Open a zip-packaged mod and index its contents.
    pub fn new(archive_path: &Utf8PathBuf) -> Result<Self> {
        let file = File::open(archive_path.as_std_path())?;
        let mut archive = ZipArchive::new(file)?;

        let mut entry_map = BTreeMap::new();
        let mut manifest_index = None;
        let content_prefix = format!("{}/", CONTENT_DIR);

        for index in 0..archive.len() {
            let entry = archive.by_index(index)?;
            if entry.is_dir() {
                continue;
            }

            let name = normalize_entry_path(entry.name());
            if name == MANIFEST_JSON {
                manifest_index = Some((index, ManifestFlavor::Json));
            } else if name == MANIFEST_TOML {
                manifest_index.get_or_insert((index, ManifestFlavor::Toml));
            } else if let Some(rel) = name.strip_prefix(&content_prefix) {
                if !rel.is_empty() {
                    entry_map.insert(rel.to_string(), index);
                }
            }
        }

        Ok(Self {
            archive,
            entry_map,
            manifest_index,
        })
    }

    fn read_index(&mut self, index: usize) -> Result<Vec<u8>> {
        let mut entry = self.archive.by_index(index)?;
        let mut bytes = Vec::with_capacity(entry.size() as usize);
        entry.read_to_end(&mut bytes)?;
        Ok(bytes)
    }
}

impl ModContent for ZipModContent {
    fn manifest(&mut self) -> Result<Option<ModManifest>> {
        let Some((index, flavor)) = self.manifest_index else {
            return Ok(None);
        };

        let bytes = self.read_index(index)?;
        let contents = String::from_utf8(bytes)
            .map_err(|e| Error::Other(format!("manifest is not UTF-8: {}", e)))?;

        let manifest = match flavor {
            ManifestFlavor::Json => ModManifest::from_json_str(&contents)
                .map_err(|e| Error::Other(format!("invalid {}: {}", MANIFEST_JSON, e)))?,
            ManifestFlavor::Toml => ModManifest::from_toml_str(&contents)
                .map_err(|e| Error::Other(format!("invalid {}: {}", MANIFEST_TOML, e)))?,
        };

        Ok(Some(manifest))
    }

    fn entry_paths(&mut self) -> Result<Vec<String>> {
        Ok(self.entry_map.keys().cloned().collect())
    }

    fn read_entry(&mut self, path: &str) -> Result<Vec<u8>> {
        let index = *self
            .entry_map
            .get(path)
            .ok_or_else(|| Error::Other(format!("mod entry not found: {}", path)))?;
        self.read_index(index)
    }
}
