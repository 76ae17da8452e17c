//! Emberfall path detection and validation utilities.

use camino::{Utf8Path, Utf8PathBuf};
use sysinfo::{Disks, System};

/// Base bundle location, relative to the game directory.
pub const BASE_BUNDLE_REL: &str = "assets/base.bundle";

/// Rebuilt (live) bundle location, relative to the game directory.
pub const LIVE_BUNDLE_REL: &str = "assets/live.bundle";

/// Mods directory, relative to the game directory.
pub const MODS_DIR_REL: &str = "mods";

/// Process names the game runs under, by platform.
const GAME_PROCESS_NAMES: &[&str] = &["Emberfall.exe", "Emberfall", "emberfall"];

/// Validates that a directory looks like an Emberfall installation.
///
/// The pristine base bundle must be present; that is the one file every
/// install ships with and the one this launcher can never recreate.
pub fn is_valid_game_dir(path: &Utf8Path) -> bool {
    path.join(BASE_BUNDLE_REL).as_std_path().is_file()
}

/// Whether an Emberfall game process is currently running.
///
/// The rebuild pipeline must not replace the live bundle while the game
/// holds it open.
pub fn is_game_running() -> bool {
    let system = System::new_all();
    GAME_PROCESS_NAMES
        .iter()
        .any(|name| system.processes_by_name(name.as_ref()).next().is_some())
}

/// Get all available drives using sysinfo (cross-platform).
fn get_available_drives() -> Vec<String> {
    let disks = Disks::new_with_refreshed_list();

    let mut drives: Vec<String> = disks
        .iter()
        .filter_map(|disk| disk.mount_point().to_str().map(|s| s.to_string()))
        .collect();

    // Fallback to common Windows drives if detection fails
    if drives.is_empty() && cfg!(target_os = "windows") {
        drives = vec!["C:", "D:", "E:", "F:"]
            .into_iter()
            .map(String::from)
            .collect();
    }

    drives
}

/// Detect the game directory from a running Emberfall process.
fn detect_from_running_process() -> Option<Utf8PathBuf> {
    let system = System::new_all();

    for name in GAME_PROCESS_NAMES {
        for process in system.processes_by_name(name.as_ref()) {
            let Some(exe) = process
                .exe()
                .and_then(|p| Utf8PathBuf::from_path_buf(p.to_path_buf()).ok())
            else {
                continue;
            };

            if let Some(game_dir) = exe.parent() {
                if is_valid_game_dir(game_dir) {
                    return Some(game_dir.to_path_buf());
                }
            }
        }
    }

    None
}

/// Check common installation paths on all available drives.
fn detect_from_common_paths() -> Option<Utf8PathBuf> {
    let drives = get_available_drives();
    let mut paths_to_check = Vec::new();

    for drive in &drives {
        let drive_root = drive.trim_end_matches(['\\', '/']);

        paths_to_check.push(
            Utf8PathBuf::from(drive_root)
                .join("Program Files (x86)")
                .join("Steam")
                .join("steamapps")
                .join("common")
                .join("Emberfall"),
        );
        paths_to_check.push(
            Utf8PathBuf::from(drive_root)
                .join("Games")
                .join("Emberfall"),
        );
    }

    if let Ok(home) = std::env::var("HOME") {
        paths_to_check.push(
            Utf8PathBuf::from(home)
                .join(".local")
                .join("share")
                .join("Steam")
                .join("steamapps")
                .join("common")
                .join("Emberfall"),
        );
    }

    paths_to_check
        .into_iter()
        .find(|path| is_valid_game_dir(path))
}

/// Auto-detect the Emberfall installation directory.
///
/// Detection methods (in order of reliability):
/// 1. Running Emberfall process
/// 2. Common installation paths
pub fn auto_detect_game_dir() -> Option<Utf8PathBuf> {
    detect_from_running_process().or_else(detect_from_common_paths)
}
