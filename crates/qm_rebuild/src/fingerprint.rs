//! Build fingerprint computation.
//!
//! A fingerprint digests everything that determines the bytes of a rebuilt
//! bundle: the base bundle's content hash and the ordered `(id, version,
//! content hash)` triples of the enabled mods. Two scans that would produce
//! byte-identical rebuilt bundles produce equal fingerprints; any change to
//! the enabled set, the merge order, or any mod's content changes the value.
//!
//! Disabled mods contribute nothing — a disabled mod and an absent mod are
//! indistinguishable here, which is exactly what lets the pipeline skip a
//! rebuild when a user removes a mod they had already disabled.

use crate::inventory::ModPackage;
use xxhash_rust::xxh3::xxh3_64;

/// Compute the fingerprint for a base bundle hash and an ordered set of
/// enabled mods.
pub fn compute_fingerprint(base_hash: u64, enabled_mods: &[&ModPackage]) -> u64 {
    let mut buf = Vec::with_capacity(8 + enabled_mods.len() * 48);
    buf.extend_from_slice(&base_hash.to_le_bytes());

    for package in enabled_mods {
        buf.extend_from_slice(package.id.as_bytes());
        buf.push(0);
        buf.extend_from_slice(package.version.as_bytes());
        buf.push(0);
        buf.extend_from_slice(&package.content_hash.to_le_bytes());
    }

    xxh3_64(&buf)
}
