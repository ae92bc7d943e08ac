use core::fmt::Display;

use displaydoc::Display;

use crate::strip::Strip;

/// A specialized result type for the Trainpixels engine.
pub type Result<T> = core::result::Result<T, Error>;

/// Errors that can occur while loading definitions or driving the LED strips.
///
/// Everything except [`Error::Hardware`], [`Error::InboxBusy`] and [`Error::InvalidTransition`]
/// is a configuration error: it is detected before the engine starts animating and requires
/// a corrected file and a restart.
#[derive(Clone, PartialEq, Eq, Display, Debug)]
pub enum Error {
    /// Malformed JSON document {origin}: {message}
    Json { origin: String, message: String },
    /// Unable to read {path}: {message}
    Io { path: String, message: String },
    /// Invalid step #{step} in the path of track {track:?}: {reason}
    InvalidPathStep {
        track: String,
        step: usize,
        reason: String,
    },
    /// Color {name:?} referenced by {owner} is not defined in the color table
    UnknownColor { name: String, owner: String },
    /// Color {name:?} is invalid: {reason}
    InvalidColor { name: String, reason: String },
    /// Track {track:?} references an unknown utility {utility:?}
    UnknownUtility { track: String, utility: String },
    /// Unknown track {0:?}
    UnknownTrack(String),
    /// Duplicate {kind} id {id:?}
    DuplicateId { kind: &'static str, id: String },
    /// Pixel {index} is out of range of the {strip} strip with {len} pixels
    PixelOutOfRange {
        strip: Strip,
        index: usize,
        len: usize,
    },
    /// Utility {utility:?} uses the reserved status LED {led}
    ReservedStatusLed { utility: String, led: usize },
    /// Invalid setting {name}: {reason}
    InvalidSetting { name: &'static str, reason: String },
    /// Utility {0:?} has no LEDs assigned
    EmptyUtility(String),
    /// Track {0:?} has an empty path
    EmptyTrack(String),
    /// No track definitions found
    NoTracks,
    /// No utility definitions found
    NoUtilities,
    /// Pixel driver failure: {0}
    Hardware(String),
    /// Command inbox {0} still holds an unconsumed command
    InboxBusy(String),
    /// Operation {operation} is not allowed in the {phase} phase
    InvalidTransition {
        operation: &'static str,
        phase: &'static str,
    },
}

impl Error {
    /// Creates a new JSON decoding error for the given document.
    pub fn json<E>(origin: impl Display, err: E) -> Self
    where
        E: Display,
    {
        Self::Json {
            origin: origin.to_string(),
            message: err.to_string(),
        }
    }

    /// Creates a new file access error.
    pub fn io<E>(path: impl Display, err: E) -> Self
    where
        E: Display,
    {
        Self::Io {
            path: path.to_string(),
            message: err.to_string(),
        }
    }

    /// Creates a new pixel driver error.
    pub fn hardware<E>(err: E) -> Self
    where
        E: Display,
    {
        Self::Hardware(err.to_string())
    }

    pub(crate) fn invalid_setting(name: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidSetting {
            name,
            reason: reason.into(),
        }
    }

    /// Returns true if this error is caused by the pixel hardware.
    pub fn is_hardware(&self) -> bool {
        matches!(self, Self::Hardware(_))
    }

    /// Returns true if this error is caused by an invalid configuration.
    pub fn is_config(&self) -> bool {
        !matches!(
            self,
            Self::Hardware(_) | Self::InboxBusy(_) | Self::InvalidTransition { .. }
        )
    }
}

impl std::error::Error for Error {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        assert!(Error::NoTracks.is_config());
        assert!(!Error::NoTracks.is_hardware());

        let err = Error::hardware("spi bus is gone");
        assert!(err.is_hardware());
        assert!(!err.is_config());
        assert_eq!(err.to_string(), "Pixel driver failure: spi bus is gone");

        let err = Error::InvalidTransition {
            operation: "tick",
            phase: "idle",
        };
        assert!(!err.is_config());
        assert!(!Error::InboxBusy("/tmp/inbox".into()).is_config());
    }

    #[test]
    fn test_error_display() {
        let err = Error::UnknownUtility {
            track: "main".into(),
            utility: "arrow_26".into(),
        };
        assert_eq!(
            err.to_string(),
            r#"Track "main" references an unknown utility "arrow_26""#
        );

        let err = Error::PixelOutOfRange {
            strip: Strip::Track,
            index: 41,
            len: 41,
        };
        assert_eq!(
            err.to_string(),
            "Pixel 41 is out of range of the track strip with 41 pixels"
        );
    }
}
