//! Process-wide engine settings.

use core::{fmt::Display, time::Duration};

use serde::{Deserialize, Serialize};

use crate::{
    color::{default_color_table, ColorTable},
    Error, Result,
};

/// Palette names used by the status indicator.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct StatusColors {
    pub ok: String,
    pub warn: String,
    pub error: String,
}

impl Default for StatusColors {
    fn default() -> Self {
        Self {
            ok: "green".to_owned(),
            warn: "yellow".to_owned(),
            error: "red".to_owned(),
        }
    }
}

/// An immutable engine configuration.
///
/// Every field is optional in the JSON document, missing fields take the default values.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Settings {
    /// The number of LEDs in the track strip.
    pub track_pixel_length: usize,
    /// The number of LEDs in the utility strip.
    pub util_pixel_length: usize,
    /// Hardware identifier of the track strip, passed to the pixel driver untouched.
    pub track_pin: String,
    /// Hardware identifier of the utility strip, passed to the pixel driver untouched.
    pub util_pin: String,
    /// Index of the utility strip LED reserved for the engine status.
    pub status_util_led: usize,
    /// Global strip brightness in `[0, 1]`.
    pub brightness: f32,
    pub track_speed_modifier: f64,
    /// Probability in `[0, 1]` of a random utility toggle per trigger.
    pub random_util_trigger_chance: f64,
    pub color_table: ColorTable,
    /// Track step interval for a track with speed `1.0`.
    pub base_tick_interval_ms: u64,
    /// Sleep between two scheduler ticks.
    pub frame_interval_ms: u64,
    /// Minimal interval between two random trigger draws, `0` means every tick.
    pub random_trigger_interval_ms: u64,
    pub train_color: String,
    pub status_colors: StatusColors,
    /// Allows to fall back to the dummy pixel driver if the hardware is not available.
    pub allow_dummy_driver: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            track_pixel_length: 41,
            util_pixel_length: 43,
            track_pin: "/dev/spidev0.0".to_owned(),
            util_pin: "/dev/spidev1.0".to_owned(),
            status_util_led: 42,
            brightness: 0.3,
            track_speed_modifier: 1.0,
            random_util_trigger_chance: 0.01,
            color_table: default_color_table(),
            base_tick_interval_ms: 1_000,
            frame_interval_ms: 20,
            random_trigger_interval_ms: 0,
            train_color: "white".to_owned(),
            status_colors: StatusColors::default(),
            allow_dummy_driver: false,
        }
    }
}

impl Settings {
    /// Parses and validates a settings JSON document.
    pub fn from_json(origin: impl Display, json: &str) -> Result<Self> {
        let settings: Self =
            serde_json::from_str(json).map_err(|err| Error::json(&origin, err))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Checks the value ranges of every option.
    pub fn validate(&self) -> Result<()> {
        if self.track_pixel_length == 0 {
            return Err(Error::invalid_setting("track_pixel_length", "must be positive"));
        }
        if self.util_pixel_length == 0 {
            return Err(Error::invalid_setting("util_pixel_length", "must be positive"));
        }
        if self.status_util_led >= self.util_pixel_length {
            return Err(Error::invalid_setting(
                "status_util_led",
                format!(
                    "{} is out of the utility strip with {} pixels",
                    self.status_util_led, self.util_pixel_length
                ),
            ));
        }
        if !(0.0..=1.0).contains(&self.brightness) {
            return Err(Error::invalid_setting("brightness", "must be in [0, 1]"));
        }
        if !(self.track_speed_modifier.is_finite() && self.track_speed_modifier > 0.0) {
            return Err(Error::invalid_setting("track_speed_modifier", "must be positive"));
        }
        if !(0.0..=1.0).contains(&self.random_util_trigger_chance) {
            return Err(Error::invalid_setting(
                "random_util_trigger_chance",
                "must be in [0, 1]",
            ));
        }
        if self.base_tick_interval_ms == 0 {
            return Err(Error::invalid_setting("base_tick_interval_ms", "must be positive"));
        }
        if self.frame_interval_ms == 0 {
            return Err(Error::invalid_setting("frame_interval_ms", "must be positive"));
        }
        Ok(())
    }

    /// Computes the interval between two steps of a track with the given speed.
    pub fn track_delay(&self, speed: f64) -> Result<Duration> {
        let factor = speed * self.track_speed_modifier;
        if !(factor.is_finite() && factor > 0.0) {
            return Err(Error::invalid_setting(
                "track_speed_modifier",
                format!("speed factor {factor} must be positive"),
            ));
        }

        let base = Duration::from_millis(self.base_tick_interval_ms);
        Duration::try_from_secs_f64(base.as_secs_f64() / factor)
            .map_err(|err| Error::invalid_setting("track_speed_modifier", err.to_string()))
    }

    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms)
    }

    pub fn random_trigger_interval(&self) -> Duration {
        Duration::from_millis(self.random_trigger_interval_ms)
    }

    /// Global brightness in the form expected by [`smart_leds::brightness`].
    pub fn brightness_level(&self) -> u8 {
        (self.brightness.clamp(0.0, 1.0) * 255.0).round() as u8
    }
}
