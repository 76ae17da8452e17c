//! Core shared logic for the Quartermaster launcher.
//!
//! This crate provides Emberfall installation discovery and validation used
//! by the `quartermaster` CLI before any rebuild work starts.

mod game_path;

pub use game_path::{
    auto_detect_game_dir, is_game_running, is_valid_game_dir, BASE_BUNDLE_REL, LIVE_BUNDLE_REL,
    MODS_DIR_REL,
};
