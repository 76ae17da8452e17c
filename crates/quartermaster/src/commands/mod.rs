mod build;
mod mods;
mod status;

pub use build::{run_build, BuildArgs};
pub use mods::{list_mods, toggle_mod, ListModsArgs, ToggleModArgs};
pub use status::{show_status, StatusArgs};
