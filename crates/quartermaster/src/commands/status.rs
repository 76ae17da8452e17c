use crate::config::{ensure_mods_dir, load_config, GamePaths};
use crate::errors::CliError;
use colored::Colorize;
use qm_rebuild::{compute_fingerprint, BuildState, RebuildPipeline};

pub struct StatusArgs {
    pub game_dir: Option<String>,
}

pub fn show_status(args: StatusArgs) -> miette::Result<()> {
    let config = load_config()?;
    let paths = GamePaths::resolve(args.game_dir.as_deref(), &config)?;
    ensure_mods_dir(&paths)?;

    let inventory =
        qm_rebuild::scan(&paths.mods_dir).map_err(|source| CliError::ScanFailed { source })?;

    let base_hash = qm_bundle::hash_file(&paths.base_bundle).map_err(|e| {
        CliError::BuildFailed {
            source: qm_rebuild::Error::BaseBundleUnreadable {
                path: paths.base_bundle.clone(),
                reason: e.to_string(),
            },
        }
    })?;

    let enabled = inventory.enabled();
    let fingerprint = compute_fingerprint(base_hash, &enabled);

    println!("{} {}", "Game:".bold(), paths.game_dir);
    println!(
        "{} {} installed, {} enabled, {} skipped",
        "Mods:".bold(),
        inventory.mods.len(),
        enabled.len(),
        inventory.skipped.len()
    );
    println!("{} {:016x}", "Fingerprint:".bold(), fingerprint);

    let state_path = RebuildPipeline::default_state_path(&paths.destination);
    let state = BuildState::load(&state_path, &paths.destination);

    match &state {
        Some(state) => println!("{} {:016x}", "Last build:".bold(), state.fingerprint),
        None => println!("{} none", "Last build:".bold()),
    }

    if !paths.destination.as_std_path().exists() {
        println!("{} live bundle missing; rebuild required", "→".yellow().bold());
    } else {
        match state {
            Some(state) if state.matches(fingerprint) => {
                println!("{} live bundle is up to date", "✓".green().bold());
            }
            Some(_) => {
                println!(
                    "{} mod set or game files changed; rebuild required",
                    "→".yellow().bold()
                );
            }
            None => {
                println!("{} no build state; rebuild required", "→".yellow().bold());
            }
        }
    }

    Ok(())
}
