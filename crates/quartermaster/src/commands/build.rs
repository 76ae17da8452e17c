use crate::config::{ensure_mods_dir, load_config, GamePaths};
use crate::errors::CliError;
use crate::preflight::run_preflight;
use colored::Colorize;
use qm_rebuild::{BuildStage, BuildStatus, RebuildPipeline};

pub struct BuildArgs {
    pub force: bool,
    pub game_dir: Option<String>,
}

pub fn run_build(args: BuildArgs) -> miette::Result<()> {
    let config = load_config()?;
    let paths = GamePaths::resolve(args.game_dir.as_deref(), &config)?;
    run_preflight(&paths)?;
    ensure_mods_dir(&paths)?;

    if qm_game::is_game_running() {
        return Err(CliError::GameRunning.into());
    }

    println!("{} {}", "Game:".bold(), paths.game_dir);

    let pipeline = RebuildPipeline::new(
        paths.base_bundle.clone(),
        paths.mods_dir.clone(),
        paths.destination.clone(),
    )
    .with_progress(|progress| {
        let label = match progress.stage {
            BuildStage::Scanning => "Scanning mods",
            BuildStage::Deciding => "Checking build state",
            BuildStage::Merging => "Merging bundle",
            BuildStage::Verifying => "Verifying output",
            BuildStage::Complete => return,
        };
        match &progress.detail {
            Some(detail) => println!("{} {} ({})", "::".cyan().bold(), label, detail),
            None => println!("{} {}", "::".cyan().bold(), label),
        }
    });

    let result = pipeline
        .run(args.force)
        .map_err(|source| CliError::BuildFailed { source })?;

    match result.status {
        BuildStatus::Reused => {
            println!(
                "{} Live bundle is up to date ({} mods enabled)",
                "✓".green().bold(),
                result.inventory.enabled().len()
            );
        }
        BuildStatus::Rebuilt => {
            if let Some(report) = &result.report {
                println!(
                    "{} Rebuilt {} ({} entries, {} from mods, {} conflicts) in {:.2}s",
                    "✓".green().bold(),
                    paths.destination,
                    report.entries_written,
                    report.added_entries + report.overwrites.len(),
                    report.overwrites.len(),
                    result.build_time.as_secs_f32()
                );

                for skipped in &report.skipped_mods {
                    println!(
                        "{} Mod '{}' was dropped from the merge: {}",
                        "!".yellow().bold(),
                        skipped.id,
                        skipped.reason
                    );
                }
            }
        }
    }

    for skipped in &result.inventory.skipped {
        println!(
            "{} Skipped package '{}': {}",
            "!".yellow().bold(),
            skipped.path,
            skipped.reason
        );
    }

    Ok(())
}
