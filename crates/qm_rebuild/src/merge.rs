//! Bundle merge engine.
//!
//! [`merge`] produces the rebuilt live bundle from the pristine base bundle
//! and an ordered list of enabled mods:
//!
//! 1. Seed the output entry set with every base entry.
//! 2. Apply each mod in order, each mod's entries in its declared order.
//!    A path already present — from the base or an earlier mod — is
//!    overwritten: later mods win. Every overwrite is recorded in the
//!    [`MergeReport`].
//! 3. Write the result to a temporary file in the destination directory and
//!    atomically rename it over the destination. No partially written
//!    bundle is ever observable at the stable path; a crash or error at any
//!    point leaves the previous destination byte-identical.
//!
//! A mod whose entries cannot be read is dropped in full (with a warning in
//! the report) and the merge continues — one broken mod must not block the
//! rest. An unreadable base bundle or an unwritable destination is fatal.

use crate::content::ModContent;
use crate::error::{Error, Result};
use camino::Utf8Path;
use qm_bundle::{Bundle, BundleWriter};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::io::{Read, Seek, SeekFrom, Write};
use xxhash_rust::xxh3::Xxh3;

/// One enabled mod to fold into the merge, in merge order.
pub struct MergeInput {
    /// Mod identifier, used in the merge report and logging.
    pub id: String,
    /// Content provider for the mod's entries.
    pub content: Box<dyn ModContent>,
}

/// Which contributor supplied a bundle entry.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase", tag = "kind", content = "id")]
pub enum EntryOrigin {
    /// The pristine base bundle.
    Base,
    /// The mod with the given identifier.
    Mod(String),
}

impl fmt::Display for EntryOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntryOrigin::Base => f.write_str("base"),
            EntryOrigin::Mod(id) => write!(f, "mod '{}'", id),
        }
    }
}

/// A recorded conflict: one contributor's entry replaced another's.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Overwrite {
    pub path: String,
    pub losing: EntryOrigin,
    pub winning: EntryOrigin,
}

/// A mod dropped from the merge, with the reason.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedMod {
    pub id: String,
    pub reason: String,
}

/// Diagnostics from one merge run.
///
/// Serializable so the surrounding launcher can hand it to its process
/// logger or render it in the UI. The conflict list makes the
/// last-writer-wins policy auditable after the fact.
#[derive(Debug, Clone, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct MergeReport {
    /// Total entries in the rebuilt bundle.
    pub entries_written: usize,
    /// Entries that came from the base bundle (overwritten or not).
    pub base_entries: usize,
    /// Entries introduced by mods that the base bundle did not contain.
    pub added_entries: usize,
    /// Every overwrite that occurred, in application order.
    pub overwrites: Vec<Overwrite>,
    /// Mods dropped from the merge.
    pub skipped_mods: Vec<SkippedMod>,
}

/// Result of a successful merge.
#[derive(Debug)]
pub struct MergeOutcome {
    /// Content hash of the bundle now at the destination.
    pub content_hash: u64,
    /// Diagnostics for the logger/UI.
    pub report: MergeReport,
}

enum Payload {
    /// Entry payload still lives in the base bundle; streamed at write time.
    Base,
    /// Entry payload supplied by a mod.
    Bytes(Vec<u8>),
}

/// Merge `mods` over the base bundle at `base_path` and atomically replace
/// `destination` with the result.
pub fn merge(
    base_path: &Utf8Path,
    mods: Vec<MergeInput>,
    destination: &Utf8Path,
) -> Result<MergeOutcome> {
    let start = std::time::Instant::now();

    let mut base = Bundle::open(base_path).map_err(|e| Error::BaseBundleUnreadable {
        path: base_path.to_path_buf(),
        reason: e.to_string(),
    })?;

    let mut output: BTreeMap<String, (EntryOrigin, Payload)> = base
        .entries()
        .iter()
        .map(|entry| (entry.path.clone(), (EntryOrigin::Base, Payload::Base)))
        .collect();

    let mut report = MergeReport {
        base_entries: output.len(),
        ..Default::default()
    };

    for mut input in mods {
        // Read the whole mod up front: either all of its entries land in
        // the output or none do. Applying half a mod would leave the bundle
        // in a state no mod order can explain.
        let entries = match collect_mod_entries(&mut input) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!("Dropping mod '{}' from merge: {}", input.id, e);
                report.skipped_mods.push(SkippedMod {
                    id: input.id,
                    reason: e.to_string(),
                });
                continue;
            }
        };

        tracing::debug!("Applying mod '{}': {} entries", input.id, entries.len());

        for (path, bytes) in entries {
            let winning = EntryOrigin::Mod(input.id.clone());
            match output.insert(path.clone(), (winning.clone(), Payload::Bytes(bytes))) {
                Some((losing, _)) => {
                    tracing::debug!("Entry '{}': {} overrides {}", path, winning, losing);
                    report.overwrites.push(Overwrite {
                        path,
                        losing,
                        winning,
                    });
                }
                None => report.added_entries += 1,
            }
        }
    }

    report.entries_written = output.len();

    let content_hash = write_output(&mut base, &output, destination)?;

    tracing::info!(
        "Merged bundle written to '{}': {} entries ({} base, {} added), {} overwrites, {} mods skipped, hash {:016x}, elapsed_ms={}",
        destination,
        report.entries_written,
        report.base_entries,
        report.added_entries,
        report.overwrites.len(),
        report.skipped_mods.len(),
        content_hash,
        start.elapsed().as_millis()
    );

    Ok(MergeOutcome {
        content_hash,
        report,
    })
}

fn collect_mod_entries(input: &mut MergeInput) -> Result<Vec<(String, Vec<u8>)>> {
    let paths = input.content.entry_paths()?;
    paths
        .into_iter()
        .map(|path| {
            let bytes = input.content.read_entry(&path)?;
            Ok((path, bytes))
        })
        .collect()
}

/// Write the merged entry set to a temp file and rename it over the
/// destination. Returns the content hash of the written bundle.
fn write_output(
    base: &mut Bundle<std::fs::File>,
    output: &BTreeMap<String, (EntryOrigin, Payload)>,
    destination: &Utf8Path,
) -> Result<u64> {
    let unwritable = |e: &dyn fmt::Display| Error::DestinationUnwritable {
        path: destination.to_path_buf(),
        reason: e.to_string(),
    };

    let parent = destination.parent().unwrap_or(Utf8Path::new("."));
    std::fs::create_dir_all(parent.as_std_path()).map_err(|e| unwritable(&e))?;

    let mut temp =
        tempfile::NamedTempFile::new_in(parent.as_std_path()).map_err(|e| unwritable(&e))?;

    {
        let mut writer = BundleWriter::new(temp.as_file_mut());
        for (path, (_, payload)) in output {
            let from_base;
            let bytes: &[u8] = match payload {
                Payload::Bytes(bytes) => bytes,
                Payload::Base => {
                    from_base = base.read_entry(path)?;
                    &from_base
                }
            };
            writer.write_entry(path, bytes)?;
        }
        writer.finish()?;
    }

    temp.flush()?;

    let file = temp.as_file_mut();
    file.seek(SeekFrom::Start(0))?;
    let content_hash = hash_reader(file)?;

    temp.persist(destination.as_std_path())
        .map_err(|e| unwritable(&e))?;

    Ok(content_hash)
}

fn hash_reader(reader: &mut impl Read) -> Result<u64> {
    let mut hasher = Xxh3::new();
    let mut buf = [0u8; 64 * 1024];

    loop {
        let n = reader.read(&mut buf)?;
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
    use camino::Utf8PathBuf;
    use std::fs;
    use tempfile::tempdir;

    /// In-memory mod content with optional injected read failure.
    struct MemContent {
        entries: Vec<(String, Vec<u8>)>,
        fail_on: Option<String>,
    }

    impl MemContent {
        fn new(entries: &[(&str, &[u8])]) -> Self {
            Self {
                entries: entries
                    .iter()
                    .map(|(p, b)| (p.to_string(), b.to_vec()))
                    .collect(),
                fail_on: None,
            }
        }

        fn failing_on(mut self, path: &str) -> Self {
            self.fail_on = Some(path.to_string());
            self
        }
    }

    impl ModContent for MemContent {
        fn manifest(&mut self) -> Result<Option<qm_manifest::ModManifest>> {
            Ok(None)
        }

        fn entry_paths(&mut self) -> Result<Vec<String>> {
            Ok(self.entries.iter().map(|(p, _)| p.clone()).collect())
        }

        fn read_entry(&mut self, path: &str) -> Result<Vec<u8>> {
            if self.fail_on.as_deref() == Some(path) {
                return Err(Error::Other(format!("injected failure for {}", path)));
            }
            self.entries
                .iter()
                .find(|(p, _)| p == path)
                .map(|(_, b)| b.clone())
                .ok_or_else(|| Error::Other(format!("mod entry not found: {}", path)))
        }
    }

    fn input(id: &str, content: MemContent) -> MergeInput {
        MergeInput {
            id: id.to_string(),
            content: Box::new(content),
        }
    }

    fn write_base(path: &Utf8Path, entries: &[(&str, &[u8])]) {
        let file = fs::File::create(path.as_std_path()).unwrap();
        let mut writer = BundleWriter::new(file);
        for (entry_path, bytes) in entries {
            writer.write_entry(entry_path, bytes).unwrap();
        }
        writer.finish().unwrap();
    }

    fn read_all(path: &Utf8Path) -> BTreeMap<String, Vec<u8>> {
        let mut bundle = Bundle::open(path).unwrap();
        let paths: Vec<String> = bundle.entries().iter().map(|e| e.path.clone()).collect();
        paths
            .into_iter()
            .map(|p| {
                let bytes = bundle.read_entry(&p).unwrap();
                (p, bytes)
            })
            .collect()
    }

    fn fixture() -> (tempfile::TempDir, Utf8PathBuf, Utf8PathBuf) {
        let dir = tempdir().unwrap();
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
        let base = root.join("base.bundle");
        let dest = root.join("live.bundle");
        (dir, base, dest)
    }

    #[test]
    fn test_base_only_merge() {
        let (_guard, base, dest) = fixture();
        write_base(&base, &[("data/core.dat", b"X")]);

        let outcome = merge(&base, vec![], &dest).unwrap();
        assert_eq!(outcome.report.entries_written, 1);
        assert_eq!(outcome.report.base_entries, 1);
        assert!(outcome.report.overwrites.is_empty());
        assert_eq!(read_all(&dest)["data/core.dat"], b"X");
    }

    #[test]
    fn test_last_writer_wins() {
        let (_guard, base, dest) = fixture();
        write_base(&base, &[("data/core.dat", b"X")]);

        let outcome = merge(
            &base,
            vec![
                input("m1", MemContent::new(&[("data/core.dat", b"A")])),
                input("m2", MemContent::new(&[("data/core.dat", b"B")])),
            ],
            &dest,
        )
        .unwrap();

        assert_eq!(read_all(&dest)["data/core.dat"], b"B");

        assert_eq!(outcome.report.overwrites.len(), 2);
        assert_eq!(outcome.report.overwrites[0].losing, EntryOrigin::Base);
        assert_eq!(
            outcome.report.overwrites[0].winning,
            EntryOrigin::Mod("m1".to_string())
        );
        assert_eq!(
            outcome.report.overwrites[1].losing,
            EntryOrigin::Mod("m1".to_string())
        );
        assert_eq!(
            outcome.report.overwrites[1].winning,
            EntryOrigin::Mod("m2".to_string())
        );
    }

    #[test]
    fn test_union_of_base_and_mods() {
        let (_guard, base, dest) = fixture();
        write_base(&base, &[("data/core.dat", b"X")]);

        let outcome = merge(
            &base,
            vec![input("m1", MemContent::new(&[("data/extra.dat", b"E1")]))],
            &dest,
        )
        .unwrap();

        assert_eq!(outcome.report.entries_written, 2);
        assert_eq!(outcome.report.added_entries, 1);

        let entries = read_all(&dest);
        assert_eq!(entries["data/core.dat"], b"X");
        assert_eq!(entries["data/extra.dat"], b"E1");
    }

    #[test]
    fn test_broken_mod_dropped_whole() {
        let (_guard, base, dest) = fixture();
        write_base(&base, &[("data/core.dat", b"X")]);

        let outcome = merge(
            &base,
            vec![
                input(
                    "broken",
                    MemContent::new(&[("data/core.dat", b"A"), ("data/other.dat", b"O")])
                        .failing_on("data/other.dat"),
                ),
                input("ok", MemContent::new(&[("data/extra.dat", b"E")])),
            ],
            &dest,
        )
        .unwrap();

        assert_eq!(outcome.report.skipped_mods.len(), 1);
        assert_eq!(outcome.report.skipped_mods[0].id, "broken");

        // Nothing from the broken mod landed, not even its readable entry.
        let entries = read_all(&dest);
        assert_eq!(entries["data/core.dat"], b"X");
        assert_eq!(entries["data/extra.dat"], b"E");
        assert_eq!(entries.len(), 2);
    }

    #[test]
    fn test_merge_is_deterministic() {
        let (_guard, base, dest) = fixture();
        write_base(&base, &[("data/core.dat", b"X"), ("data/b.dat", b"B")]);

        let mods = || {
            vec![
                input("m1", MemContent::new(&[("data/core.dat", b"A")])),
                input("m2", MemContent::new(&[("data/new.dat", b"N")])),
            ]
        };

        let first_hash = merge(&base, mods(), &dest).unwrap().content_hash;
        let first_bytes = fs::read(dest.as_std_path()).unwrap();

        let second_hash = merge(&base, mods(), &dest).unwrap().content_hash;
        let second_bytes = fs::read(dest.as_std_path()).unwrap();

        assert_eq!(first_hash, second_hash);
        assert_eq!(first_bytes, second_bytes);
    }

    #[test]
    fn test_content_hash_matches_destination() {
        let (_guard, base, dest) = fixture();
        write_base(&base, &[("data/core.dat", b"X")]);

        let outcome = merge(&base, vec![], &dest).unwrap();
        assert_eq!(outcome.content_hash, qm_bundle::hash_file(&dest).unwrap());
    }

    #[test]
    fn test_unreadable_base_is_fatal() {
        let (_guard, base, dest) = fixture();
        fs::write(base.as_std_path(), b"not a bundle").unwrap();

        let err = merge(&base, vec![], &dest).unwrap_err();
        assert!(matches!(err, Error::BaseBundleUnreadable { .. }));
    }

    #[test]
    fn test_failed_merge_leaves_destination_untouched() {
        let (_guard, base, dest) = fixture();

        // A previous live bundle exists; the new base is unreadable.
        fs::write(dest.as_std_path(), b"previous live bundle").unwrap();
        fs::write(base.as_std_path(), b"not a bundle").unwrap();

        let before = fs::read(dest.as_std_path()).unwrap();
        assert!(merge(&base, vec![], &dest).is_err());
        let after = fs::read(dest.as_std_path()).unwrap();

        assert_eq!(before, after);
    }

    #[test]
    fn test_unwritable_destination_is_fatal() {
        let (_guard, base, dest_root) = fixture();
        write_base(&base, &[("data/core.dat", b"X")]);

        // The destination's parent is a file, so nothing can be created there.
        fs::write(dest_root.as_std_path(), b"blocker").unwrap();
        let dest = dest_root.join("live.bundle");

        let err = merge(&base, vec![], &dest).unwrap_err();
        assert!(matches!(err, Error::DestinationUnwritable { .. }));
    }
}
