//! Trainpixels animation engine
//!
//! The [`Scheduler`] owns the engine state and both pixel buffers. It advances the
//! selected track, fires the utility triggers attached to the path steps and runs the
//! random utility trigger process, all within a single cooperative tick.

// Linter configuration
#![warn(unsafe_code, clippy::pedantic, clippy::use_self)]
// Too many false positives.
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions
)]

pub use trainpixels_core as core;
pub use trainpixels_core::{Error as TrainpixelsError, Result as TrainpixelsResult};

pub use crate::{
    commands::Command,
    random::RandomTrigger,
    scheduler::{EngineState, Phase, Scheduler, Status, TickReport},
};

mod commands;
mod random;
mod scheduler;
