use crate::config::{ensure_mods_dir, load_config, GamePaths};
use crate::errors::CliError;
use camino::{Utf8Path, Utf8PathBuf};
use colored::Colorize;
use qm_manifest::{ModManifest, MANIFEST_JSON, MANIFEST_TOML};
use qm_rebuild::{ModPackage, ModSource};
use std::fs;

pub struct ListModsArgs {
    pub game_dir: Option<String>,
}

pub fn list_mods(args: ListModsArgs) -> miette::Result<()> {
    let config = load_config()?;
    let paths = GamePaths::resolve(args.game_dir.as_deref(), &config)?;
    ensure_mods_dir(&paths)?;

    let inventory =
        qm_rebuild::scan(&paths.mods_dir).map_err(|source| CliError::ScanFailed { source })?;

    if inventory.mods.is_empty() && inventory.skipped.is_empty() {
        println!("No mods installed in '{}'.", paths.mods_dir);
        return Ok(());
    }

    for package in &inventory.mods {
        let marker = if package.enabled {
            "●".green()
        } else {
            "○".dimmed()
        };
        let name = if package.enabled {
            package.id.normal()
        } else {
            package.id.dimmed()
        };
        println!(
            "{} {} v{}  (order {}, {} entries)  {}",
            marker,
            name,
            package.version,
            package.order,
            package.entry_count,
            package.display_name.dimmed()
        );
    }

    for skipped in &inventory.skipped {
        println!(
            "{} {}: {}",
            "!".yellow().bold(),
            skipped.path,
            skipped.reason
        );
    }

    Ok(())
}

pub struct ToggleModArgs {
    pub id: String,
    pub game_dir: Option<String>,
}

pub fn toggle_mod(args: ToggleModArgs, enabled: bool) -> miette::Result<()> {
    let config = load_config()?;
    let paths = GamePaths::resolve(args.game_dir.as_deref(), &config)?;
    ensure_mods_dir(&paths)?;

    let inventory =
        qm_rebuild::scan(&paths.mods_dir).map_err(|source| CliError::ScanFailed { source })?;

    let package = inventory
        .mods
        .iter()
        .find(|m| m.id == args.id)
        .ok_or_else(|| CliError::mod_not_found(args.id.clone()))?;

    if package.enabled == enabled {
        println!(
            "Mod '{}' is already {}.",
            package.id,
            if enabled { "enabled" } else { "disabled" }
        );
        return Ok(());
    }

    apply_toggle(package, enabled)?;

    println!(
        "{} Mod '{}' {}. Run `quartermaster build` to apply.",
        "✓".green().bold(),
        package.id,
        if enabled { "enabled" } else { "disabled" }
    );

    Ok(())
}

fn apply_toggle(package: &ModPackage, enabled: bool) -> Result<(), CliError> {
    match &package.source {
        ModSource::Directory(mod_dir) => set_manifest_enabled(mod_dir, enabled),
        ModSource::Archive(archive) => {
            // Archives cannot carry a mutable flag; toggle the sidecar marker.
            let marker = Utf8PathBuf::from(format!("{}.disabled", archive));
            if enabled {
                if marker.as_std_path().exists() {
                    fs::remove_file(marker.as_std_path())?;
                }
            } else {
                fs::write(marker.as_std_path(), b"")?;
            }
            Ok(())
        }
    }
}

fn set_manifest_enabled(mod_dir: &Utf8Path, enabled: bool) -> Result<(), CliError> {
    let json_path = mod_dir.join(MANIFEST_JSON);
    if json_path.as_std_path().is_file() {
        let contents = fs::read_to_string(json_path.as_std_path())?;
        let mut manifest: ModManifest =
            serde_json::from_str(&contents).map_err(std::io::Error::other)?;
        manifest.enabled = enabled;
        let contents = serde_json::to_string_pretty(&manifest).map_err(std::io::Error::other)?;
        fs::write(json_path.as_std_path(), contents)?;
        return Ok(());
    }

    let toml_path = mod_dir.join(MANIFEST_TOML);
    let contents = fs::read_to_string(toml_path.as_std_path())?;
    let mut manifest: ModManifest = toml::from_str(&contents).map_err(std::io::Error::other)?;
    manifest.enabled = enabled;
    let contents = toml::to_string_pretty(&manifest).map_err(std::io::Error::other)?;
    fs::write(toml_path.as_std_path(), contents)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use qm_rebuild::DirModContent;
    use qm_rebuild::ModContent;
    use tempfile::tempdir;

    #[test]
    fn test_set_manifest_enabled_roundtrip() {
        let dir = tempdir().unwrap();
        let mod_dir = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();

        fs::write(
            mod_dir.join(MANIFEST_JSON).as_std_path(),
            r#"{"name": "m", "display_name": "M", "version": "1.0.0", "enabled": true}"#,
        )
        .unwrap();

        set_manifest_enabled(&mod_dir, false).unwrap();

        let mut provider = DirModContent::new(mod_dir);
        let manifest = provider.manifest().unwrap().unwrap();
        assert!(!manifest.enabled);
    }
}
