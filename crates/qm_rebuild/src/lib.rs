//! Mod-merge rebuild pipeline for the Quartermaster launcher.
//!
//! This crate decides when Emberfall's live bundle must be rebuilt to
//! include installed mods, and performs that rebuild safely and
//! incrementally. It supports:
//!
//! - **Inventory scanning**: enumerate mod packages (directories or zip
//!   archives) with deterministic merge ordering
//! - **Incremental rebuilds**: fingerprint the inputs and skip the build
//!   when nothing changed since the last verified rebuild
//! - **Last-writer-wins merging**: overlay mod entries onto the base
//!   bundle, recording every conflict in an auditable report
//! - **Atomic replacement**: the live bundle and the state record are only
//!   ever swapped into place fully written
//!
//! # Example
//!
//! ```no_run
//! use camino::Utf8PathBuf;
//! use qm_rebuild::RebuildPipeline;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let game_dir = Utf8PathBuf::from("C:/Games/Emberfall");
//!
//! let pipeline = RebuildPipeline::new(
//!     game_dir.join("assets/base.bundle"),
//!     game_dir.join("mods"),
//!     game_dir.join("assets/live.bundle"),
//! )
//! .with_progress(|progress| {
//!     println!("Stage: {:?}", progress.stage);
//! });
//!
//! let result = pipeline.run(false)?;
//! println!("Build finished: {:?} in {:?}", result.status, result.build_time);
//! # Ok(())
//! # }
//! ```

pub mod content;
pub mod error;
pub mod fingerprint;
pub mod inventory;
pub mod merge;
pub mod pipeline;
pub mod state;

// Re-export main types
pub use content::{DirModContent, ModContent, ZipModContent};
pub use error::{Error, Result};
pub use fingerprint::compute_fingerprint;
pub use inventory::{scan, ModInventory, ModPackage, ModSource, SkippedPackage};
pub use merge::{EntryOrigin, MergeReport, Overwrite, SkippedMod};
pub use pipeline::{BuildProgress, BuildResult, BuildStage, BuildStatus, RebuildPipeline};
pub use state::{BuildState, ModStamp};
