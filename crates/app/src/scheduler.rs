//! Animation scheduler state machine.

use std::{
    collections::{BTreeMap, BTreeSet},
    mem,
    sync::Arc,
    time::{Duration, Instant},
};

use rand::{rngs::SmallRng, SeedableRng};
use trainpixels_core::{
    Definitions, Error, PixelDriver, Pixels, Result, Strip, Track, TrackId, Utility, UtilityId,
};

use crate::{Command, RandomTrigger};

/// Scheduler lifecycle phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// No track selected, buffers are cleared.
    Idle,
    /// A track is being animated.
    Running,
    /// Cleanup is in progress.
    Stopping,
    /// Final phase, the scheduler no longer accepts any operations.
    Terminated,
}

impl Phase {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Stopping => "stopping",
            Self::Terminated => "terminated",
        }
    }
}

/// Engine health shown by the status LED.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ok,
    Warn,
    Error,
}

/// Mutable engine state, owned exclusively by the [`Scheduler`].
#[derive(Debug, Clone)]
pub struct EngineState {
    phase: Phase,
    track: Option<TrackId>,
    position: Option<usize>,
    cursor: usize,
    enabled: BTreeMap<UtilityId, bool>,
    touched: BTreeSet<UtilityId>,
    tick_count: u64,
    status: Status,
}

impl EngineState {
    fn new(utilities: &[Utility]) -> Self {
        Self {
            phase: Phase::Idle,
            track: None,
            position: None,
            cursor: 0,
            enabled: utilities
                .iter()
                .map(|utility| (utility.id.clone(), utility.enabled_on_init))
                .collect(),
            touched: BTreeSet::new(),
            tick_count: 0,
            status: Status::Ok,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// The currently selected track.
    pub fn track(&self) -> Option<&TrackId> {
        self.track.as_ref()
    }

    /// Track pixel index of the train marker.
    pub fn position(&self) -> Option<usize> {
        self.position
    }

    /// Index of the next path step.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn is_enabled(&self, utility: &str) -> bool {
        self.enabled.get(utility).copied().unwrap_or_default()
    }

    /// Utilities activated by the current track run.
    pub fn touched(&self) -> &BTreeSet<UtilityId> {
        &self.touched
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn status(&self) -> Status {
        self.status
    }
}

/// Effects applied by a single [`Scheduler::tick`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    /// New train position, if the track advanced.
    pub advanced: Option<usize>,
    /// Utilities activated by the path step.
    pub triggered: Vec<UtilityId>,
    /// Utilities toggled by the random trigger process.
    pub toggled: Vec<UtilityId>,
    /// The non-looping track has completed and the scheduler returned to idle.
    pub finished: bool,
    /// Number of strips flushed to the driver.
    pub flushed: usize,
}

#[derive(Debug, Clone, Copy)]
struct RunTiming {
    delay: Duration,
    last_advance: Option<Instant>,
}

/// Returns the new anchor of a periodic process if its period has elapsed.
///
/// The anchor moves by whole periods so the frame cadence does not stretch the
/// period. A process that fell more than one period behind is re-anchored at
/// `now` and never catches up with a burst.
pub(crate) fn next_anchor(
    last: Option<Instant>,
    now: Instant,
    period: Duration,
) -> Option<Instant> {
    let Some(last) = last else {
        return Some(now);
    };
    let elapsed = now.saturating_duration_since(last);
    if elapsed < period {
        None
    } else if elapsed < period * 2 {
        Some(last + period)
    } else {
        Some(now)
    }
}

/// Single-threaded cooperative animation scheduler.
///
/// All buffer mutations happen in memory, the driver sees them once per tick in
/// [`Self::tick`] or when the scheduler transitions between phases.
pub struct Scheduler<D: PixelDriver> {
    definitions: Arc<Definitions>,
    pixels: Pixels<D>,
    state: EngineState,
    random: RandomTrigger,
    rng: SmallRng,
    timing: Option<RunTiming>,
    started: bool,
}

impl<D: PixelDriver> Scheduler<D> {
    /// Creates a new scheduler with an entropy seeded random generator.
    ///
    /// The strips are blanked and the status LED is lit.
    pub fn new(definitions: Arc<Definitions>, driver: D) -> Result<Self> {
        Self::with_rng(definitions, driver, SmallRng::from_entropy())
    }

    pub fn with_seed(definitions: Arc<Definitions>, driver: D, seed: u64) -> Result<Self> {
        Self::with_rng(definitions, driver, SmallRng::seed_from_u64(seed))
    }

    pub fn with_rng(definitions: Arc<Definitions>, driver: D, rng: SmallRng) -> Result<Self> {
        let settings = definitions.settings();
        let mut pixels = Pixels::new(
            driver,
            settings.track_pixel_length,
            settings.util_pixel_length,
        );
        pixels.reset()?;
        let random = RandomTrigger::from_settings(settings);

        let mut scheduler = Self {
            state: EngineState::new(definitions.utilities()),
            random,
            definitions,
            pixels,
            rng,
            timing: None,
            started: false,
        };
        scheduler.set_status(Status::Ok)?;
        scheduler.pixels.flush_changed()?;
        Ok(scheduler)
    }

    pub fn state(&self) -> &EngineState {
        &self.state
    }

    pub fn pixels(&self) -> &Pixels<D> {
        &self.pixels
    }

    pub fn definitions(&self) -> &Definitions {
        &self.definitions
    }

    pub fn is_running(&self) -> bool {
        self.state.phase == Phase::Running
    }

    pub fn is_terminated(&self) -> bool {
        self.state.phase == Phase::Terminated
    }

    fn ensure_not_terminated(&self, operation: &'static str) -> Result<()> {
        if self.is_terminated() {
            return Err(Error::InvalidTransition {
                operation,
                phase: self.state.phase.as_str(),
            });
        }
        Ok(())
    }

    /// Starts animating the given track from its first step.
    ///
    /// If another track is running, it is cleaned up first.
    pub fn select(&mut self, id: &str, now: Instant) -> Result<()> {
        self.ensure_not_terminated("select")?;

        let definitions = Arc::clone(&self.definitions);
        let track = definitions
            .track(id)
            .ok_or_else(|| Error::UnknownTrack(id.to_owned()))?;
        self.start_run(track, now)
    }

    /// Starts animating the track with the given 1-based number.
    pub fn select_number(&mut self, number: usize, now: Instant) -> Result<()> {
        self.ensure_not_terminated("select")?;

        let definitions = Arc::clone(&self.definitions);
        let track = definitions
            .track_by_number(number)
            .ok_or_else(|| Error::UnknownTrack(number.to_string()))?;
        self.start_run(track, now)
    }

    fn start_run(&mut self, track: &Track, now: Instant) -> Result<()> {
        let delay = self.definitions.settings().track_delay(track.speed)?;

        if self.is_running() {
            log::info!(
                "Switching from track {:?} to {:?}",
                self.state.track.as_ref().map(|id| id.0.as_str()),
                track.id.0
            );
            self.clear_run()?;
        }

        self.state.phase = Phase::Running;
        self.state.track = Some(track.id.clone());
        self.state.cursor = 0;
        self.state.position = None;
        self.timing = Some(RunTiming {
            delay,
            last_advance: None,
        });
        self.random.restart(now);
        self.started = true;

        self.paint_utilities()?;
        self.set_status(Status::Ok)?;
        log::info!(
            "Running track {:?} ({}), {} steps every {:?}",
            track.id.0,
            track.name,
            track.path.len(),
            delay
        );
        Ok(())
    }

    /// Stops the current track and returns to the idle phase.
    pub fn deselect(&mut self) -> Result<()> {
        self.ensure_not_terminated("deselect")?;
        if !self.is_running() {
            return Ok(());
        }

        self.clear_run()?;
        self.restore_baselines();
        self.blank_buffers();
        self.state.phase = Phase::Idle;
        self.set_status(Status::Ok)?;
        self.pixels.flush_changed()?;
        log::info!("Track deselected, engine is idle");
        Ok(())
    }

    /// Performs a single cooperative iteration.
    ///
    /// The track advances at most one step and the random trigger fires at most once,
    /// track effects are applied first. Every changed buffer is flushed once.
    pub fn tick(&mut self, now: Instant) -> Result<TickReport> {
        if !self.is_running() {
            return Err(Error::InvalidTransition {
                operation: "tick",
                phase: self.state.phase.as_str(),
            });
        }

        self.state.tick_count += 1;
        let mut report = TickReport::default();

        self.advance_track(now, &mut report)?;
        if self.is_running() && self.random.is_due(now) {
            self.run_random_trigger(&mut report)?;
        }

        report.flushed = self.pixels.flush_changed()?;
        Ok(report)
    }

    fn advance_track(&mut self, now: Instant, report: &mut TickReport) -> Result<()> {
        let Some(timing) = self.timing.as_mut() else {
            return Ok(());
        };
        let Some(anchor) = next_anchor(timing.last_advance, now, timing.delay) else {
            return Ok(());
        };
        timing.last_advance = Some(anchor);

        let definitions = Arc::clone(&self.definitions);
        let Some(track) = self
            .state
            .track
            .as_ref()
            .and_then(|id| definitions.track(&id.0)) else {
            return Ok(());
        };

        if self.state.cursor >= track.path.len() {
            // Only a non-looping track can get here.
            log::info!("Track {:?} completed", track.id.0);
            self.clear_run()?;
            self.restore_baselines();
            self.blank_buffers();
            self.state.phase = Phase::Idle;
            self.set_status(Status::Ok)?;
            report.finished = true;
            return Ok(());
        }

        let step = &track.path[self.state.cursor];
        let palette = definitions.palette();
        if let Some(previous) = self.state.position {
            self.pixels.set(Strip::Track, previous, palette.off())?;
        }
        let train_color = palette.resolve(&definitions.settings().train_color)?;
        self.pixels.set(Strip::Track, step.index(), train_color)?;
        self.state.position = Some(step.index());
        report.advanced = Some(step.index());

        for id in step.triggers() {
            self.state.enabled.insert(id.clone(), true);
            self.state.touched.insert(id.clone());
            self.paint_utility(id, true)?;
            report.triggered.push(id.clone());
        }
        log::debug!(
            "Track {:?} step {} -> pixel {}, triggered {:?}",
            track.id.0,
            self.state.cursor,
            step.index(),
            step.triggers()
        );

        self.state.cursor += 1;
        if self.state.cursor == track.path.len() && track.looping {
            self.state.cursor = 0;
        }
        Ok(())
    }

    fn run_random_trigger(&mut self, report: &mut TickReport) -> Result<()> {
        let definitions = Arc::clone(&self.definitions);
        for utility in RandomTrigger::candidates(definitions.utilities(), &self.state.touched) {
            if !self.random.draw(&mut self.rng) {
                continue;
            }

            let enabled = !self.state.is_enabled(&utility.id.0);
            self.state.enabled.insert(utility.id.clone(), enabled);
            report.toggled.push(utility.id.clone());
        }

        for id in &report.toggled {
            let enabled = self.state.is_enabled(&id.0);
            self.paint_utility(id, enabled)?;
            log::debug!("Randomly switched utility {:?} to {}", id.0, enabled);
        }
        Ok(())
    }

    /// Stops the engine: extinguishes the train, restores every utility to its baseline
    /// and leaves only the status LED lit on the strips.
    ///
    /// Calling it on a terminated scheduler does nothing.
    pub fn stop(&mut self) -> Result<()> {
        if self.is_terminated() {
            return Ok(());
        }

        log::info!("Stopping the engine");
        if self.is_running() {
            self.clear_run()?;
        }
        self.state.phase = Phase::Stopping;
        self.set_status(Status::Warn)?;
        self.restore_baselines();
        self.blank_buffers();

        let result = self.pixels.flush_changed();
        self.state.phase = Phase::Terminated;
        result.map(drop)
    }

    /// Reports an unrecoverable error on the status LED and terminates the scheduler.
    ///
    /// If a track has ever been started, all other LEDs are switched off.
    pub fn fail(&mut self, error: &Error) {
        log::error!("Engine failure: {error}");

        self.state.track = None;
        self.state.position = None;
        self.state.touched.clear();
        self.timing = None;
        if self.started {
            self.restore_baselines();
            self.blank_buffers();
        }
        if let Err(err) = self.set_status(Status::Error) {
            log::error!("Unable to show the error status: {err}");
        }
        if let Err(err) = self.pixels.flush_changed() {
            log::error!("Unable to flush the strips: {err}");
        }
        self.state.phase = Phase::Terminated;
    }

    /// Applies a command received from an external controller.
    pub fn apply(&mut self, command: Command, now: Instant) -> Result<()> {
        log::info!("Applying command {command:?}");
        match command {
            Command::Select(id) => self.select(&id.0, now),
            Command::SelectNumber(number) => self.select_number(number, now),
            Command::Deselect => self.deselect(),
            Command::Stop => self.stop(),
        }
    }

    /// Flushes pending buffer changes made outside of a tick.
    pub fn flush(&mut self) -> Result<usize> {
        self.pixels.flush_changed()
    }

    /// Undoes the effects of the current run: extinguishes the train marker and returns
    /// the utilities touched by the track to their baseline.
    fn clear_run(&mut self) -> Result<()> {
        let previous_phase = self.state.phase;
        self.state.phase = Phase::Stopping;
        self.set_status(Status::Warn)?;

        let off = self.definitions.palette().off();
        if let Some(position) = self.state.position.take() {
            self.pixels.set(Strip::Track, position, off)?;
        }

        let definitions = Arc::clone(&self.definitions);
        let touched = mem::take(&mut self.state.touched);
        for id in &touched {
            let baseline = definitions
                .utility(&id.0)
                .is_some_and(|utility| utility.enabled_on_init);
            self.state.enabled.insert(id.clone(), baseline);
        }
        // Utilities may share a LED, so the enabled ones are painted last.
        for id in &touched {
            if !self.state.is_enabled(&id.0) {
                self.paint_utility(id, false)?;
            }
        }
        self.paint_enabled()?;

        self.state.track = None;
        self.state.cursor = 0;
        self.timing = None;
        self.state.phase = previous_phase;
        Ok(())
    }

    fn restore_baselines(&mut self) {
        for utility in self.definitions.utilities() {
            self.state
                .enabled
                .insert(utility.id.clone(), utility.enabled_on_init);
        }
    }

    /// Switches every pixel off except the status LED.
    fn blank_buffers(&mut self) {
        let off = self.definitions.palette().off();
        let status_led = self.definitions.settings().status_util_led;
        self.pixels.buffer_mut(Strip::Track).fill_except(off, None);
        self.pixels
            .buffer_mut(Strip::Utility)
            .fill_except(off, Some(status_led));
    }

    /// Paints every utility by its flag, the disabled ones first.
    fn paint_utilities(&mut self) -> Result<()> {
        let definitions = Arc::clone(&self.definitions);
        for utility in definitions.utilities() {
            if !self.state.is_enabled(&utility.id.0) {
                self.paint(utility, false)?;
            }
        }
        self.paint_enabled()
    }

    fn paint_enabled(&mut self) -> Result<()> {
        let definitions = Arc::clone(&self.definitions);
        for utility in definitions.utilities() {
            if self.state.is_enabled(&utility.id.0) {
                self.paint(utility, true)?;
            }
        }
        Ok(())
    }

    fn paint_utility(&mut self, id: &UtilityId, enabled: bool) -> Result<()> {
        let definitions = Arc::clone(&self.definitions);
        let utility = definitions
            .utility(&id.0)
            .ok_or_else(|| Error::UnknownUtility {
                track: self
                    .state
                    .track
                    .as_ref()
                    .map(|id| id.0.clone())
                    .unwrap_or_default(),
                utility: id.0.clone(),
            })?;
        self.paint(utility, enabled)
    }

    fn paint(&mut self, utility: &Utility, enabled: bool) -> Result<()> {
        let palette = self.definitions.palette();
        for led in &utility.leds {
            let color = if enabled {
                palette.resolve(&led.color)?
            } else {
                palette.off()
            };
            self.pixels.set(Strip::Utility, led.led, color)?;
        }
        Ok(())
    }

    fn set_status(&mut self, status: Status) -> Result<()> {
        let settings = self.definitions.settings();
        let colors = &settings.status_colors;
        let name = match status {
            Status::Ok => &colors.ok,
            Status::Warn => &colors.warn,
            Status::Error => &colors.error,
        };

        let color = self.definitions.palette().resolve(name)?;
        self.pixels
            .set(Strip::Utility, settings.status_util_led, color)?;
        self.state.status = status;
        Ok(())
    }
}
