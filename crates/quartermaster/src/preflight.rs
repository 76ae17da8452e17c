//! Preconditions checked before any rebuild work starts.
//!
//! These mirror what the launcher verifies on startup: the install layout
//! is real, and the one-time runtime patch has been applied on platforms
//! that need it. The patch itself is a separate tool; this module only
//! gates on its marker.

use crate::config::GamePaths;
use crate::errors::CliError;
use camino::Utf8Path;

/// Marker file the runtime patcher drops after a successful patch.
const RUNTIME_PATCHED_MARKER: &str = ".patched";

/// Verify that rebuilding can proceed against this installation.
pub fn run_preflight(paths: &GamePaths) -> Result<(), CliError> {
    if !qm_game::is_valid_game_dir(&paths.game_dir) {
        return Err(CliError::invalid_game_dir(paths.game_dir.clone()));
    }

    if runtime_patch_pending(&paths.game_dir) {
        return Err(CliError::RuntimeNotPatched);
    }

    Ok(())
}

/// Whether the install ships a bundled runtime that still needs the
/// one-time patch. Only 64-bit Windows installs carry that runtime.
fn runtime_patch_pending(game_dir: &Utf8Path) -> bool {
    if !cfg!(all(windows, target_arch = "x86_64")) {
        return false;
    }

    let runtime_dir = game_dir.join("runtime");
    runtime_dir.as_std_path().is_dir()
        && !runtime_dir
            .join(RUNTIME_PATCHED_MARKER)
            .as_std_path()
            .exists()
}
