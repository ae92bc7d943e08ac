use std::{
    fs,
    path::{Path, PathBuf},
};

use trainpixels_core::{Definitions, Error, Result, Settings, Track, Utility};

/// Optional settings document.
pub const SETTINGS_FILE: &str = "settings.json";
/// Directory with the track documents.
pub const TRACKS_DIR: &str = "tracks";
/// Directory with the utility documents.
pub const UTILS_DIR: &str = "utils";

/// Loads and validates every definition from the configuration directory.
///
/// Documents are read in the file name order, so the track numbers are stable.
pub fn load_definitions(dir: &Path) -> Result<Definitions> {
    let settings_path = dir.join(SETTINGS_FILE);
    let settings = if settings_path.is_file() {
        Settings::from_json(settings_path.display(), &read_document(&settings_path)?)?
    } else {
        log::info!(
            "{} is missing, using the default settings",
            settings_path.display()
        );
        Settings::default()
    };

    let tracks = documents(dir, TRACKS_DIR)?
        .iter()
        .map(|path| Track::from_json(path.display(), &read_document(path)?))
        .collect::<Result<Vec<_>>>()?;
    let utilities = documents(dir, UTILS_DIR)?
        .iter()
        .map(|path| Utility::from_json(path.display(), &read_document(path)?))
        .collect::<Result<Vec<_>>>()?;

    log::info!(
        "Loaded {} tracks and {} utilities from {}",
        tracks.len(),
        utilities.len(),
        dir.display()
    );
    Definitions::new(settings, tracks, utilities)
}

fn read_document(path: &Path) -> Result<String> {
    log::debug!("Reading {}", path.display());
    fs::read_to_string(path).map_err(|err| Error::io(path.display(), err))
}

fn documents(dir: &Path, subdir: &str) -> Result<Vec<PathBuf>> {
    let base = dir.join(subdir);
    let base = base
        .to_str()
        .ok_or_else(|| Error::io(base.display(), "path is not valid UTF-8"))?;
    let pattern = format!("{}/*.json", glob::Pattern::escape(base));

    let mut paths = glob::glob(&pattern)
        .map_err(|err| Error::io(&pattern, err))?
        .map(|entry| entry.map_err(|err| Error::io(err.path().display(), err.error())))
        .collect::<Result<Vec<_>>>()?;
    paths.retain(|path| path.is_file());
    paths.sort();
    Ok(paths)
}
