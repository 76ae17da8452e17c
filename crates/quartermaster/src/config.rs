//! Launcher configuration management.

use crate::errors::CliError;
use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;

/// Launcher-wide configuration stored in config.toml next to the executable.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct LauncherConfig {
    /// Emberfall install root. Auto-detected when unset.
    pub game_path: Option<String>,
    /// Override for the mods directory (default: `<game>/mods`).
    pub mods_dir: Option<String>,
    /// Override for the rebuilt bundle path (default: `<game>/assets/live.bundle`).
    pub destination: Option<String>,
}

/// Returns the directory where the current executable resides.
pub fn install_dir() -> Option<Utf8PathBuf> {
    let exe = env::current_exe().ok()?;
    let parent = exe.parent()?;
    Utf8PathBuf::from_path_buf(parent.to_path_buf()).ok()
}

/// Returns the default configuration file path (config.toml).
pub fn default_config_path() -> Option<Utf8PathBuf> {
    install_dir().map(|dir| dir.join("config.toml"))
}

/// Loads the launcher configuration from config.toml.
/// Returns default configuration if the file doesn't exist.
pub fn load_config() -> Result<LauncherConfig, CliError> {
    let Some(path) = default_config_path() else {
        return Ok(LauncherConfig::default());
    };
    if !path.as_std_path().exists() {
        return Ok(LauncherConfig::default());
    }

    let content = fs::read_to_string(path.as_std_path())?;
    toml::from_str(&content).map_err(|e| CliError::config_parse_error(Box::new(e)))
}

/// The resolved filesystem layout a command operates on.
#[derive(Debug, Clone)]
pub struct GamePaths {
    pub game_dir: Utf8PathBuf,
    pub base_bundle: Utf8PathBuf,
    pub mods_dir: Utf8PathBuf,
    pub destination: Utf8PathBuf,
}

impl GamePaths {
    /// Resolve the game layout from, in priority order: the `--game-dir`
    /// CLI override, the config file, and auto-detection.
    pub fn resolve(
        cli_game_dir: Option<&str>,
        config: &LauncherConfig,
    ) -> Result<Self, CliError> {
        let game_dir = match cli_game_dir.or(config.game_path.as_deref()) {
            Some(dir) => {
                let dir = Utf8PathBuf::from(dir);
                if !qm_game::is_valid_game_dir(&dir) {
                    return Err(CliError::invalid_game_dir(dir));
                }
                dir
            }
            None => qm_game::auto_detect_game_dir().ok_or(CliError::GameDirNotFound)?,
        };

        let mods_dir = config
            .mods_dir
            .as_deref()
            .map(Utf8PathBuf::from)
            .unwrap_or_else(|| game_dir.join(qm_game::MODS_DIR_REL));

        let destination = config
            .destination
            .as_deref()
            .map(Utf8PathBuf::from)
            .unwrap_or_else(|| game_dir.join(qm_game::LIVE_BUNDLE_REL));

        Ok(Self {
            base_bundle: game_dir.join(qm_game::BASE_BUNDLE_REL),
            mods_dir,
            destination,
            game_dir,
        })
    }
}

/// Ensure the mods directory exists so a fresh install lists as empty
/// instead of failing the scan.
pub fn ensure_mods_dir(paths: &GamePaths) -> Result<(), CliError> {
    if !paths.mods_dir.as_std_path().exists() {
        fs::create_dir_all(paths.mods_dir.as_std_path())?;
        tracing::info!("Created mods directory '{}'", paths.mods_dir);
    }
    Ok(())
}
