//! Mod inventory scanning.
//!
//! [`scan`] enumerates the packages in a mods directory and produces the
//! full, deterministically ordered inventory the rest of the pipeline works
//! from. A package is either an unpacked directory or a `.zip` archive.
//! Malformed packages never abort a scan — each is skipped with a recorded
//! reason so the launcher UI can surface it.
//!
//! Ordering is the contract everything downstream leans on: mods sort by
//! their load-order hint ascending, ties broken by identifier. The same
//! mods on the same machine — or any other machine — always scan into the
//! same sequence, which is what makes build fingerprints and merge results
//! reproducible.

use crate::content::{DirModContent, ModContent, ZipModContent};
use crate::error::{Error, Result};
use camino::{Utf8Path, Utf8PathBuf};
use rayon::prelude::*;
use serde::Serialize;
use xxhash_rust::xxh3::xxh3_64;

/// Version assigned to legacy archive packages that carry no manifest.
const LEGACY_VERSION: &str = "0.0.0";

/// Where a mod package's content lives on disk.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase", tag = "kind", content = "path")]
pub enum ModSource {
    /// An unpacked mod directory (manifest + `content/` tree).
    Directory(Utf8PathBuf),
    /// A `.zip`-packaged mod.
    Archive(Utf8PathBuf),
}

impl ModSource {
    /// The package's path on disk.
    pub fn path(&self) -> &Utf8Path {
        match self {
            ModSource::Directory(p) | ModSource::Archive(p) => p,
        }
    }

    /// Open a content provider for this package.
    pub fn open(&self) -> Result<Box<dyn ModContent>> {
        match self {
            ModSource::Directory(p) => Ok(Box::new(DirModContent::new(p.clone()))),
            ModSource::Archive(p) => Ok(Box::new(ZipModContent::new(p)?)),
        }
    }
}

/// One successfully scanned mod package.
///
/// Immutable once scanned; discarded at the end of a build cycle.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModPackage {
    /// Unique identifier within the scan.
    pub id: String,
    /// Human-readable name for UI listings.
    pub display_name: String,
    /// Semantic version string from the manifest (`0.0.0` for legacy
    /// archives).
    pub version: String,
    /// Whether the mod participates in rebuilds. Disabled mods stay in the
    /// inventory so the UI can list them; the pipeline filters them out.
    pub enabled: bool,
    /// Load-order hint from the manifest (ascending; later wins conflicts).
    pub order: i64,
    /// Digest of the mod's entry set: any change to an entry path or
    /// payload changes this value, and with it the build fingerprint.
    pub content_hash: u64,
    /// Number of bundle entries the mod contributes.
    pub entry_count: usize,
    /// Where the package lives.
    pub source: ModSource,
}

/// A package that failed to scan, with the reason it was skipped.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedPackage {
    pub path: Utf8PathBuf,
    pub reason: String,
}

/// Full result of scanning a mods directory.
#[derive(Debug, Clone, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ModInventory {
    /// All valid packages, disabled ones included, in resolved merge order.
    pub mods: Vec<ModPackage>,
    /// Packages that failed to parse, with reasons.
    pub skipped: Vec<SkippedPackage>,
}

impl ModInventory {
    /// The enabled mods, in resolved merge order.
    pub fn enabled(&self) -> Vec<&ModPackage> {
        self.mods.iter().filter(|m| m.enabled).collect()
    }
}

/// Scan a mods directory into an ordered inventory.
///
/// Immediate children of `mods_dir` are considered: subdirectories and
/// `.zip` files. Anything else is ignored. A package that fails to parse is
/// skipped and recorded, never fatal. The directory itself missing is fatal
/// ([`Error::InvalidModsDir`]) — the caller is pointing at the wrong place.
pub fn scan(mods_dir: &Utf8Path) -> Result<ModInventory> {
    if !mods_dir.as_std_path().is_dir() {
        return Err(Error::InvalidModsDir(mods_dir.to_path_buf()));
    }

    // Deterministic candidate order; this also fixes which duplicate of an
    // identifier wins (the first one listed).
    let mut candidates = collect_candidates(mods_dir)?;
    candidates.sort_by(|a, b| a.source.path().cmp(b.source.path()));

    // Hashing every entry of every mod is the expensive part of a scan;
    // packages are independent, so do them in parallel. Order of results is
    // preserved, so the outcome is identical to a sequential scan.
    let outcomes: Vec<_> = candidates
        .into_par_iter()
        .map(|candidate| scan_package(candidate))
        .collect();

    let mut inventory = ModInventory::default();
    let mut seen_ids = std::collections::HashSet::new();

    for outcome in outcomes {
        match outcome {
            Ok(package) => {
                if !seen_ids.insert(package.id.clone()) {
                    tracing::warn!(
                        "Skipping mod package '{}': duplicate identifier '{}'",
                        package.source.path(),
                        package.id
                    );
                    inventory.skipped.push(SkippedPackage {
                        path: package.source.path().to_path_buf(),
                        reason: format!("duplicate identifier '{}'", package.id),
                    });
                    continue;
                }
                inventory.mods.push(package);
            }
            Err(skipped) => {
                tracing::warn!(
                    "Skipping mod package '{}': {}",
                    skipped.path,
                    skipped.reason
                );
                inventory.skipped.push(skipped);
            }
        }
    }

    inventory
        .mods
        .sort_by(|a, b| a.order.cmp(&b.order).then_with(|| a.id.cmp(&b.id)));

    tracing::info!(
        "Scanned mods dir '{}': {} mods ({} enabled), {} skipped",
        mods_dir,
        inventory.mods.len(),
        inventory.mods.iter().filter(|m| m.enabled).count(),
        inventory.skipped.len()
    );

    Ok(inventory)
}

struct Candidate {
    source: ModSource,
    disabled_marker: bool,
}

fn collect_candidates(mods_dir: &Utf8Path) -> Result<Vec<Candidate>> {
    let mut candidates = Vec::new();

    for entry in std::fs::read_dir(mods_dir.as_std_path())? {
        let entry = entry?;
        let path = match Utf8PathBuf::from_path_buf(entry.path()) {
            Ok(p) => p,
            Err(p) => {
                tracing::warn!("Skipping non-UTF-8 path: {}", p.display());
                continue;
            }
        };

        if path.as_std_path().is_dir() {
            candidates.push(Candidate {
                source: ModSource::Directory(path),
                disabled_marker: false,
            });
            continue;
        }

        let Some(name) = path.file_name() else {
            continue;
        };
        if !name.to_ascii_lowercase().ends_with(".zip") {
            continue;
        }

        // Archives cannot carry a mutable enabled flag; a sidecar marker
        // file disables them instead.
        let marker = mods_dir.join(format!("{}.disabled", name));
        candidates.push(Candidate {
            disabled_marker: marker.as_std_path().exists(),
            source: ModSource::Archive(path),
        });
    }

    Ok(candidates)
}

fn scan_package(candidate: Candidate) -> std::result::Result<ModPackage, SkippedPackage> {
    let path = candidate.source.path().to_path_buf();
    let skip = |reason: String| SkippedPackage {
        path: path.clone(),
        reason,
    };

    let mut content = candidate.source.open().map_err(|e| skip(e.to_string()))?;

    let manifest = content.manifest().map_err(|e| skip(e.to_string()))?;

    let (id, display_name, version, mut enabled, order) = match manifest {
        Some(m) => (m.name, m.display_name, m.version, m.enabled, m.order),
        None => match &candidate.source {
            ModSource::Directory(_) => {
                return Err(skip("missing mod manifest".to_string()));
            }
            // Legacy bare archive: derive an identity from the file name.
            ModSource::Archive(p) => {
                let stem = p.file_stem().unwrap_or_default();
                let id = slug::slugify(stem);
                if id.is_empty() {
                    return Err(skip("cannot derive identifier from file name".to_string()));
                }
                (id, stem.to_string(), LEGACY_VERSION.to_string(), true, 0)
            }
        },
    };

    if candidate.disabled_marker {
        enabled = false;
    }

    let entry_paths = content.entry_paths().map_err(|e| skip(e.to_string()))?;
    let content_hash = compute_content_hash(content.as_mut(), &entry_paths)
        .map_err(|e| skip(format!("unreadable mod content: {}", e)))?;

    Ok(ModPackage {
        id,
        display_name,
        version,
        enabled,
        order,
        content_hash,
        entry_count: entry_paths.len(),
        source: candidate.source,
    })
}

/// Digest a mod's entry set as sorted `(path, payload-hash)` pairs.
///
/// `paths` comes from [`ModContent::entry_paths`], which is already in the
/// declared (sorted) order, so the digest is independent of filesystem
/// iteration order.
fn compute_content_hash(content: &mut dyn ModContent, paths: &[String]) -> Result<u64> {
    let mut buf = Vec::with_capacity(paths.len() * 24);

    for path in paths {
        let bytes = content.read_entry(path)?;
        buf.extend_from_slice(path.as_bytes());
        buf.push(0);
        buf.extend_from_slice(&qm_bundle::hash_bytes(&bytes).to_le_bytes());
    }

    Ok(xxh3_64(&buf))
}
