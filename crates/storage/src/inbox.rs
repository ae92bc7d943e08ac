use std::{
    fs, io,
    path::{Path, PathBuf},
};

use trainpixels_app::Command;
use trainpixels_core::{Error, Result};

use crate::paths::user_dir;

/// File based single slot command channel between an input listener and the engine.
///
/// The producer writes the input file and then creates the lock file, the consumer
/// reads the input only while the lock file exists and removes both afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandInbox {
    dir: PathBuf,
}

impl CommandInbox {
    pub const INPUT_FILE: &'static str = "numpad_input.txt";
    pub const LOCK_FILE: &'static str = "numpad_input.lock";

    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The user cache directory inbox.
    pub fn default_dir() -> Option<PathBuf> {
        user_dir("XDG_CACHE_HOME", ".cache")
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn input_path(&self) -> PathBuf {
        self.dir.join(Self::INPUT_FILE)
    }

    fn lock_path(&self) -> PathBuf {
        self.dir.join(Self::LOCK_FILE)
    }

    /// Returns true if a command is waiting to be consumed.
    pub fn is_pending(&self) -> bool {
        self.lock_path().exists()
    }

    /// Puts a new input into the inbox.
    ///
    /// Fails with [`Error::InboxBusy`] if the previous input has not been consumed yet.
    pub fn send(&self, input: &str) -> Result<()> {
        if self.is_pending() {
            return Err(Error::InboxBusy(self.dir.display().to_string()));
        }

        fs::create_dir_all(&self.dir).map_err(|err| Error::io(self.dir.display(), err))?;
        let input_path = self.input_path();
        fs::write(&input_path, input).map_err(|err| Error::io(input_path.display(), err))?;
        let lock_path = self.lock_path();
        fs::File::create(&lock_path).map_err(|err| Error::io(lock_path.display(), err))?;

        log::debug!("Sent {input:?} to {}", self.dir.display());
        Ok(())
    }

    /// Takes the pending input out of the inbox and parses it.
    ///
    /// Returns `None` if there is no pending input or if it is empty.
    pub fn poll(&self) -> Result<Option<Command>> {
        if !self.is_pending() {
            return Ok(None);
        }

        let input_path = self.input_path();
        let input = match fs::read_to_string(&input_path) {
            Ok(input) => input,
            Err(err) if err.kind() == io::ErrorKind::NotFound => String::new(),
            Err(err) => return Err(Error::io(input_path.display(), err)),
        };
        remove_file(&input_path)?;
        remove_file(&self.lock_path())?;

        let command = Command::parse(&input);
        if command.is_none() {
            log::warn!("Ignoring an empty command in {}", self.dir.display());
        }
        Ok(command)
    }
}

fn remove_file(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Err(err) if err.kind() != io::ErrorKind::NotFound => Err(Error::io(path.display(), err)),
        _ => Ok(()),
    }
}
