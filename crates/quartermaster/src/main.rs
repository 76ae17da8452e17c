use clap::builder::{styling::AnsiColor, Styles};
use clap::ColorChoice;
use clap::{CommandFactory, FromArgMatches, Parser, Subcommand};
use commands::{
    list_mods, run_build, show_status, toggle_mod, BuildArgs, ListModsArgs, StatusArgs,
    ToggleModArgs,
};
use miette::Result;
use tracing_subscriber::EnvFilter;

mod commands;
mod config;
mod errors;
mod preflight;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Rebuild the live bundle from installed mods if anything changed
    Build {
        /// Rebuild even if the current bundle matches the mod set
        #[arg(short, long)]
        force: bool,

        /// Path to the Emberfall installation (overrides config.toml)
        #[arg(long)]
        game_dir: Option<String>,
    },
    /// List installed mods, including disabled and malformed ones
    List {
        /// Path to the Emberfall installation (overrides config.toml)
        #[arg(long)]
        game_dir: Option<String>,
    },
    /// Show whether a rebuild is needed and why
    Status {
        /// Path to the Emberfall installation (overrides config.toml)
        #[arg(long)]
        game_dir: Option<String>,
    },
    /// Enable a mod by identifier
    Enable {
        /// The mod identifier (see `list`)
        id: String,

        /// Path to the Emberfall installation (overrides config.toml)
        #[arg(long)]
        game_dir: Option<String>,
    },
    /// Disable a mod by identifier
    Disable {
        /// The mod identifier (see `list`)
        id: String,

        /// Path to the Emberfall installation (overrides config.toml)
        #[arg(long)]
        game_dir: Option<String>,
    },
}

fn parse_args() -> Args {
    // Configure colored/styled help output
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default().bold())
        .usage(AnsiColor::Green.on_default().bold())
        .literal(AnsiColor::Cyan.on_default())
        .placeholder(AnsiColor::Blue.on_default());

    let matches = Args::command()
        .styles(styles)
        .color(ColorChoice::Auto)
        .get_matches();

    Args::from_arg_matches(&matches).expect("failed to parse arguments")
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let args = parse_args();

    match args.command {
        Commands::Build { force, game_dir } => run_build(BuildArgs { force, game_dir }),
        Commands::List { game_dir } => list_mods(ListModsArgs { game_dir }),
        Commands::Status { game_dir } => show_status(StatusArgs { game_dir }),
        Commands::Enable { id, game_dir } => toggle_mod(ToggleModArgs { id, game_dir }, true),
        Commands::Disable { id, game_dir } => toggle_mod(ToggleModArgs { id, game_dir }, false),
    }
}
