use camino::Utf8PathBuf;
use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Debug, Diagnostic)]
pub enum CliError {
    #[error("Could not locate the Emberfall installation")]
    #[diagnostic(
        code(game::not_found),
        help("Set game_path in config.toml next to the quartermaster executable, or pass --game-dir")
    )]
    GameDirNotFound,

    #[error("Not a valid Emberfall installation: {path}")]
    #[diagnostic(
        code(game::invalid_dir),
        help("The directory must contain assets/base.bundle — point at the game's install root")
    )]
    InvalidGameDir { path: Utf8PathBuf },

    #[error("Emberfall is currently running")]
    #[diagnostic(
        code(game::running),
        help("Close the game before rebuilding; the live bundle cannot be replaced while it is loaded")
    )]
    GameRunning,

    #[error("The bundled runtime has not been patched yet")]
    #[diagnostic(
        code(game::runtime_unpatched),
        help("Run the one-time runtime patcher before building mod bundles")
    )]
    RuntimeNotPatched,

    #[error("No installed mod with identifier '{id}'")]
    #[diagnostic(
        code(mods::not_found),
        help("Use `quartermaster list` to see installed mod identifiers")
    )]
    ModNotFound { id: String },

    #[error("Configuration file error")]
    #[diagnostic(
        code(config::parse_error),
        help("Check your config.toml for syntax errors")
    )]
    ConfigParseError {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Bundle rebuild failed")]
    #[diagnostic(code(build::failed))]
    BuildFailed {
        #[source]
        source: qm_rebuild::Error,
    },

    #[error("Mod scan failed")]
    #[diagnostic(code(mods::scan_failed))]
    ScanFailed {
        #[source]
        source: qm_rebuild::Error,
    },

    #[error("IO operation failed")]
    #[diagnostic(code(io::operation_failed))]
    IoError {
        #[from]
        source: std::io::Error,
    },
}

impl CliError {
    pub fn invalid_game_dir(path: Utf8PathBuf) -> Self {
        Self::InvalidGameDir { path }
    }

    pub fn mod_not_found(id: String) -> Self {
        Self::ModNotFound { id }
    }

    pub fn config_parse_error(source: Box<dyn std::error::Error + Send + Sync>) -> Self {
        Self::ConfigParseError { source }
    }
}
