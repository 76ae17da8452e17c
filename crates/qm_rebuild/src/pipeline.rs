//! Rebuild pipeline orchestration.
//!
//! The [`RebuildPipeline`] is the single entry point the launcher calls per
//! run. It drives the full sequence:
//!
//! 1. **Scanning** — build the mod inventory (`inventory::scan`).
//! 2. **Deciding** — hash the base bundle, compute the build fingerprint
//!    from the enabled mods, and compare against the saved [`BuildState`].
//!    On a match (with the live bundle still present), the build is skipped
//!    entirely — the common fast path.
//! 3. **Merging** — run the merge engine to produce the new live bundle.
//! 4. **Verifying** — re-hash the destination and require it to match the
//!    hash the merge just produced, guarding against silent I/O corruption.
//! 5. **Complete** — persist the new state record.
//!
//! State is only ever written after verification passes, so the record on
//! disk always describes a bundle that was fully and correctly written.
//! Any failure surfaces as a structured [`Error`](crate::Error) to the
//! caller; nothing is persisted on the way out.
//!
//! The pipeline takes every input as an explicit path and returns a
//! structured result — it holds no ambient state and is safe to construct
//! anywhere. It runs at most once per launcher invocation; callers that can
//! race multiple launches must serialize them externally.

use crate::error::{Error, Result};
use crate::fingerprint::compute_fingerprint;
use crate::inventory::{self, ModInventory};
use crate::merge::{merge, MergeInput, MergeReport, SkippedMod};
use crate::state::{BuildState, ModStamp};
use camino::Utf8PathBuf;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

/// Stages of the rebuild pipeline, in emission order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum BuildStage {
    /// Scanning the mods directory.
    Scanning,
    /// Comparing the current fingerprint against the saved state.
    Deciding,
    /// Running the merge engine.
    Merging,
    /// Re-hashing the destination bundle.
    Verifying,
    /// Pipeline finished (rebuilt or reused).
    Complete,
}

/// Progress information emitted during a rebuild.
///
/// Serialized as JSON when forwarded to a UI layer.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildProgress {
    /// Current stage of the pipeline.
    pub stage: BuildStage,
    /// Optional human-readable detail for the stage.
    pub detail: Option<String>,
}

/// How the pipeline satisfied the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum BuildStatus {
    /// The live bundle was rebuilt and verified.
    Rebuilt,
    /// The existing live bundle matched the fingerprint and was reused.
    Reused,
}

/// Summary returned after a pipeline run completes.
#[derive(Debug)]
pub struct BuildResult {
    /// Whether a rebuild happened.
    pub status: BuildStatus,
    /// Fingerprint of the inputs the live bundle now corresponds to.
    pub fingerprint: u64,
    /// Full scan inventory, for the UI layer.
    pub inventory: ModInventory,
    /// Merge diagnostics; `None` when the build was skipped.
    pub report: Option<MergeReport>,
    /// Wall-clock time for the entire run.
    pub build_time: Duration,
}

type ProgressCallback = Arc<dyn Fn(BuildProgress) + Send + Sync>;

/// Orchestrates the rebuild pipeline.
///
/// Create with [`new`](Self::new), optionally adjust the state-record path
/// or register a progress callback, then call [`run`](Self::run).
pub struct RebuildPipeline {
    base_bundle: Utf8PathBuf,
    mods_dir: Utf8PathBuf,
    destination: Utf8PathBuf,
    state_path: Utf8PathBuf,
    progress_callback: Option<ProgressCallback>,
}

impl RebuildPipeline {
    /// Create a new pipeline.
    ///
    /// # Arguments
    ///
    /// * `base_bundle` — Path to the pristine base bundle. Never written.
    /// * `mods_dir` — Directory containing mod packages.
    /// * `destination` — Path the rebuilt live bundle is written to. The
    ///   state record defaults to `<destination>.state.json`.
    pub fn new(base_bundle: Utf8PathBuf, mods_dir: Utf8PathBuf, destination: Utf8PathBuf) -> Self {
        let state_path = Self::default_state_path(&destination);
        Self {
            base_bundle,
            mods_dir,
            destination,
            state_path,
            progress_callback: None,
        }
    }

    /// Where the state record lives for a given destination bundle.
    pub fn default_state_path(destination: &camino::Utf8Path) -> Utf8PathBuf {
        Utf8PathBuf::from(format!("{}.state.json", destination))
    }

    /// Override where the state record lives.
    pub fn with_state_path(mut self, state_path: Utf8PathBuf) -> Self {
        self.state_path = state_path;
        self
    }

    /// Register a progress callback.
    ///
    /// The callback receives [`BuildProgress`] updates at each stage. This
    /// is typically used to forward progress to the launcher UI.
    pub fn with_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(BuildProgress) + Send + Sync + 'static,
    {
        self.progress_callback = Some(Arc::new(callback));
        self
    }

    /// Run the pipeline. With `force`, the fingerprint comparison is
    /// skipped and a rebuild always happens.
    pub fn run(&self, force: bool) -> Result<BuildResult> {
        let start = std::time::Instant::now();

        tracing::info!(
            "Rebuild pipeline: base='{}' mods='{}' destination='{}' force={}",
            self.base_bundle,
            self.mods_dir,
            self.destination,
            force
        );

        self.emit(BuildStage::Scanning, None);
        let inventory = inventory::scan(&self.mods_dir)?;

        let base_hash =
            qm_bundle::hash_file(&self.base_bundle).map_err(|e| Error::BaseBundleUnreadable {
                path: self.base_bundle.clone(),
                reason: e.to_string(),
            })?;

        let enabled = inventory.enabled();
        let fingerprint = compute_fingerprint(base_hash, &enabled);

        self.emit(
            BuildStage::Deciding,
            Some(format!("fingerprint {:016x}", fingerprint)),
        );

        if !force {
            // `load` already distrusts a record whose bundle is missing, so
            // a deleted live bundle falls through to a rebuild here.
            if let Some(state) = BuildState::load(&self.state_path, &self.destination) {
                if state.matches(fingerprint) {
                    tracing::info!("Live bundle is up to date; skipping rebuild");
                    self.emit(BuildStage::Complete, Some("reused".to_string()));
                    return Ok(BuildResult {
                        status: BuildStatus::Reused,
                        fingerprint,
                        inventory,
                        report: None,
                        build_time: start.elapsed(),
                    });
                }
            }
        }

        self.emit(
            BuildStage::Merging,
            Some(format!("{} mods", enabled.len())),
        );

        let mut dropped: Vec<SkippedMod> = Vec::new();
        let mut inputs = Vec::new();
        for package in &enabled {
            match package.source.open() {
                Ok(content) => inputs.push(MergeInput {
                    id: package.id.clone(),
                    content,
                }),
                Err(e) => {
                    tracing::warn!("Dropping mod '{}' from merge: {}", package.id, e);
                    dropped.push(SkippedMod {
                        id: package.id.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        let mut outcome = merge(&self.base_bundle, inputs, &self.destination)?;
        if !dropped.is_empty() {
            dropped.append(&mut outcome.report.skipped_mods);
            outcome.report.skipped_mods = dropped;
        }

        self.emit(BuildStage::Verifying, None);
        let actual = qm_bundle::hash_file(&self.destination)?;
        if actual != outcome.content_hash {
            return Err(Error::VerificationFailed {
                path: self.destination.clone(),
                expected: outcome.content_hash,
                actual,
            });
        }

        let stamps: Vec<ModStamp> = enabled.iter().map(|p| ModStamp::from(*p)).collect();
        BuildState::new(fingerprint, base_hash, stamps).save(&self.state_path)?;

        self.emit(BuildStage::Complete, Some("rebuilt".to_string()));

        Ok(BuildResult {
            status: BuildStatus::Rebuilt,
            fingerprint,
            inventory,
            report: Some(outcome.report),
            build_time: start.elapsed(),
        })
    }

    fn emit(&self, stage: BuildStage, detail: Option<String>) {
        if let Some(callback) = &self.progress_callback {
            callback(BuildProgress { stage, detail });
        }
    }
}
