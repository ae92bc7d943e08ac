//! Validated set of definitions the engine runs on.

use std::collections::{BTreeSet, HashMap};

use crate::{
    color::Palette,
    settings::Settings,
    strip::Strip,
    track::{Track, TrackId},
    utility::{Utility, UtilityId},
    Error, Result,
};

/// Read-only registry of the settings, palette, tracks and utilities.
///
/// Construction validates every cross reference, so the engine never meets an
/// unknown color, an unknown utility or an out of range pixel.
#[derive(Debug, Clone)]
pub struct Definitions {
    settings: Settings,
    palette: Palette,
    tracks: Vec<Track>,
    utilities: Vec<Utility>,
    track_index: HashMap<TrackId, usize>,
    utility_index: HashMap<UtilityId, usize>,
}

impl Definitions {
    /// Validates and registers the given definitions.
    ///
    /// Tracks keep their order, it defines the track numbers.
    pub fn new(settings: Settings, tracks: Vec<Track>, utilities: Vec<Utility>) -> Result<Self> {
        settings.validate()?;
        let palette = Palette::new(&settings.color_table)?;

        palette.check(&settings.train_color, "train_color")?;
        let status = &settings.status_colors;
        for (name, owner) in [
            (&status.ok, "status_colors.ok"),
            (&status.warn, "status_colors.warn"),
            (&status.error, "status_colors.error"),
        ] {
            palette.check(name, owner)?;
        }

        if tracks.is_empty() {
            return Err(Error::NoTracks);
        }
        if utilities.is_empty() {
            return Err(Error::NoUtilities);
        }

        let mut utility_index = HashMap::with_capacity(utilities.len());
        for (position, utility) in utilities.iter().enumerate() {
            utility.validate()?;
            Self::check_utility(&settings, &palette, utility)?;
            if utility_index.insert(utility.id.clone(), position).is_some() {
                return Err(Error::DuplicateId {
                    kind: "utility",
                    id: utility.id.0.clone(),
                });
            }
        }

        let mut track_index = HashMap::with_capacity(tracks.len());
        for (position, track) in tracks.iter().enumerate() {
            track.validate()?;
            settings.track_delay(track.speed)?;
            Self::check_track(&settings, &utility_index, track)?;
            if track_index.insert(track.id.clone(), position).is_some() {
                return Err(Error::DuplicateId {
                    kind: "track",
                    id: track.id.0.clone(),
                });
            }
        }

        log::debug!(
            "Registered {} tracks and {} utilities",
            tracks.len(),
            utilities.len()
        );
        Ok(Self {
            settings,
            palette,
            tracks,
            utilities,
            track_index,
            utility_index,
        })
    }

    fn check_utility(settings: &Settings, palette: &Palette, utility: &Utility) -> Result<()> {
        let mut seen = BTreeSet::new();
        for led in &utility.leds {
            if led.led >= settings.util_pixel_length {
                return Err(Error::PixelOutOfRange {
                    strip: Strip::Utility,
                    index: led.led,
                    len: settings.util_pixel_length,
                });
            }
            if led.led == settings.status_util_led {
                return Err(Error::ReservedStatusLed {
                    utility: utility.id.0.clone(),
                    led: led.led,
                });
            }
            if !seen.insert(led.led) {
                return Err(Error::DuplicateId {
                    kind: "utility LED",
                    id: format!("{}[{}]", utility.id, led.led),
                });
            }
            palette.check(&led.color, format!("utility {:?}", utility.id.0))?;
        }
        Ok(())
    }

    fn check_track(
        settings: &Settings,
        utilities: &HashMap<UtilityId, usize>,
        track: &Track,
    ) -> Result<()> {
        for step in &track.path {
            if step.index() >= settings.track_pixel_length {
                return Err(Error::PixelOutOfRange {
                    strip: Strip::Track,
                    index: step.index(),
                    len: settings.track_pixel_length,
                });
            }

            if let Some(unknown) = step.triggers().iter().find(|id| !utilities.contains_key(*id)) {
                return Err(Error::UnknownUtility {
                    track: track.id.0.clone(),
                    utility: unknown.0.clone(),
                });
            }
        }
        Ok(())
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn utilities(&self) -> &[Utility] {
        &self.utilities
    }

    pub fn track(&self, id: &str) -> Option<&Track> {
        self.track_index.get(id).map(|position| &self.tracks[*position])
    }

    /// Returns a track by its 1-based number in the load order.
    pub fn track_by_number(&self, number: usize) -> Option<&Track> {
        number.checked_sub(1).and_then(|index| self.tracks.get(index))
    }

    pub fn utility(&self, id: &str) -> Option<&Utility> {
        self.utility_index
            .get(id)
            .map(|position| &self.utilities[*position])
    }
}
