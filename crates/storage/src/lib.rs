//! File system storage of the track and utility definitions and the command inbox.

// Linter configuration
#![warn(unsafe_code, clippy::pedantic, clippy::use_self)]
#![allow(clippy::missing_errors_doc, clippy::module_name_repetitions)]

pub use crate::{
    inbox::CommandInbox,
    loader::{load_definitions, SETTINGS_FILE, TRACKS_DIR, UTILS_DIR},
    paths::SearchPaths,
};

mod inbox;
mod loader;
mod paths;

/// Application directory name inside the user config and cache directories.
pub const APP_DIR: &str = "trainpixels";
