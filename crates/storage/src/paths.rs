use std::{
    env,
    path::{Path, PathBuf},
};

use trainpixels_core::{Error, Result};

use crate::APP_DIR;

const SYSTEM_CONFIG_DIR: &str = "/etc/trainpixels";

/// Ordered list of the configuration directory candidates.
///
/// The first existing directory wins, the sources are never merged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchPaths {
    candidates: Vec<PathBuf>,
}

impl SearchPaths {
    /// Creates search paths with the given explicit directory, or the default
    /// candidates if there is none.
    pub fn new(explicit: Option<PathBuf>) -> Self {
        match explicit {
            Some(dir) => Self::from_candidates(vec![dir]),
            None => Self::from_candidates(default_candidates()),
        }
    }

    pub fn from_candidates(candidates: Vec<PathBuf>) -> Self {
        Self { candidates }
    }

    pub fn candidates(&self) -> &[PathBuf] {
        &self.candidates
    }

    /// Returns the first existing configuration directory.
    pub fn resolve(&self) -> Result<PathBuf> {
        let dir = self
            .candidates
            .iter()
            .find(|dir| dir.is_dir())
            .ok_or_else(|| Error::Io {
                path: self
                    .candidates
                    .iter()
                    .map(|dir| dir.display().to_string())
                    .collect::<Vec<_>>()
                    .join(", "),
                message: "no configuration directory found".to_owned(),
            })?;

        log::info!("Using configuration directory {}", dir.display());
        Ok(dir.clone())
    }
}

/// Local installation, user config directory, system fallback.
fn default_candidates() -> Vec<PathBuf> {
    let local = env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join("config")));
    let user = user_dir("XDG_CONFIG_HOME", ".config");

    local
        .into_iter()
        .chain(user)
        .chain([PathBuf::from(SYSTEM_CONFIG_DIR)])
        .collect()
}

/// Returns the application directory inside an XDG base directory.
pub(crate) fn user_dir(xdg_var: &str, home_fallback: impl AsRef<Path>) -> Option<PathBuf> {
    let base = env::var_os(xdg_var)
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
        .or_else(|| env::var_os("HOME").map(|home| PathBuf::from(home).join(home_fallback)))?;
    Some(base.join(APP_DIR))
}
