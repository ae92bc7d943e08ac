//! Trainpixels core
//!
//! Definitions shared by the animation engine and its loaders: the color palette,
//! track and utility definitions, engine settings, the validated definitions registry
//! and the pixel buffers together with the pixel driver contract.

// Linter configuration
#![warn(unsafe_code, clippy::pedantic, clippy::use_self)]
// Too many false positives.
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]

pub use smart_leds::RGB8;

pub use crate::{
    color::{ColorEntry, Palette, OFF_COLOR},
    errors::{Error, Result},
    registry::Definitions,
    settings::{Settings, StatusColors},
    strip::{DummyDriver, MemoryDriver, PixelBuffer, PixelDriver, Pixels, SmartLedsDriver, Strip},
    track::{PathStep, Track, TrackId},
    utility::{Utility, UtilityId, UtilityLed},
};

pub mod color;
pub mod errors;
pub mod registry;
pub mod settings;
pub mod strip;
pub mod track;
pub mod utility;
pub mod ws2812_spi;
