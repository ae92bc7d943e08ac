use std::{
    collections::BTreeSet,
    time::{Duration, Instant},
};

use rand::Rng;
use trainpixels_core::{Settings, Utility, UtilityId};

use crate::scheduler::next_anchor;

/// Random utility toggling process.
///
/// It runs on the scheduler tick cadence and fires at most once per tick.
#[derive(Debug, Clone)]
pub struct RandomTrigger {
    chance: f64,
    interval: Duration,
    last_fire: Option<Instant>,
}

impl RandomTrigger {
    pub fn new(chance: f64, interval: Duration) -> Self {
        Self {
            chance,
            interval,
            last_fire: None,
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            settings.random_util_trigger_chance,
            settings.random_trigger_interval(),
        )
    }

    pub fn chance(&self) -> f64 {
        self.chance
    }

    /// Returns true if the trigger interval has elapsed, and if so starts a new interval.
    pub fn is_due(&mut self, now: Instant) -> bool {
        match next_anchor(self.last_fire, now, self.interval) {
            Some(anchor) => {
                self.last_fire = Some(anchor);
                true
            }
            None => false,
        }
    }

    /// Draws a single uniform value and tells whether the utility should be toggled.
    pub fn draw<R: Rng + ?Sized>(&self, rng: &mut R) -> bool {
        rng.gen::<f64>() < self.chance
    }

    /// Utilities the process may toggle: random eligible and not driven by the active track.
    pub fn candidates<'a>(
        utilities: &'a [Utility],
        touched: &'a BTreeSet<UtilityId>,
    ) -> impl Iterator<Item = &'a Utility> + 'a {
        utilities
            .iter()
            .filter(move |utility| utility.is_random && !touched.contains(&utility.id))
    }

    /// Starts a new interval at the given moment.
    pub fn restart(&mut self, now: Instant) {
        self.last_fire = Some(now);
    }
}

#[cfg(test)]
mod tests {
    use rand::{rngs::SmallRng, SeedableRng};
    use trainpixels_core::UtilityLed;

    use super::*;

    fn utility(id: &str, is_random: bool) -> Utility {
        Utility {
            id: id.into(),
            name: id.to_owned(),
            enabled_on_init: false,
            is_random,
            leds: vec![UtilityLed {
                led: 0,
                color: "white".to_owned(),
            }],
        }
    }

    #[test]
    fn test_interval() {
        let start = Instant::now();
        let mut trigger = RandomTrigger::new(0.5, Duration::from_millis(100));

        assert!(trigger.is_due(start));
        assert!(!trigger.is_due(start + Duration::from_millis(50)));
        assert!(trigger.is_due(start + Duration::from_millis(100)));
        assert!(!trigger.is_due(start + Duration::from_millis(150)));

        trigger.restart(start + Duration::from_millis(150));
        assert!(!trigger.is_due(start + Duration::from_millis(200)));
        assert!(trigger.is_due(start + Duration::from_millis(250)));
    }

    #[test]
    fn test_interval_is_not_stretched_by_the_tick_cadence() {
        let start = Instant::now();
        let mut trigger = RandomTrigger::new(0.5, Duration::from_millis(30));

        let fired = (0..=150)
            .filter(|&frame| trigger.is_due(start + Duration::from_millis(frame * 20)))
            .count();
        assert_eq!(fired, 101);
    }

    #[test]
    fn test_stalled_interval_does_not_burst() {
        let start = Instant::now();
        let mut trigger = RandomTrigger::new(0.5, Duration::from_millis(100));

        assert!(trigger.is_due(start));
        assert!(trigger.is_due(start + Duration::from_millis(450)));
        assert!(!trigger.is_due(start + Duration::from_millis(500)));
        assert!(trigger.is_due(start + Duration::from_millis(550)));
    }

    #[test]
    fn test_zero_interval_fires_every_tick() {
        let start = Instant::now();
        let mut trigger = RandomTrigger::new(0.5, Duration::ZERO);
        assert!((0..10).all(|_| trigger.is_due(start)));
    }

    #[test]
    fn test_draw_bounds() {
        let mut rng = SmallRng::seed_from_u64(7);

        let never = RandomTrigger::new(0.0, Duration::ZERO);
        assert!((0..10_000).all(|_| !never.draw(&mut rng)));

        let always = RandomTrigger::new(1.0, Duration::ZERO);
        assert!((0..10_000).all(|_| always.draw(&mut rng)));
    }

    #[test]
    fn test_candidates() {
        let utilities = [
            utility("a", true),
            utility("b", false),
            utility("c", true),
        ];
        let touched = BTreeSet::from([UtilityId::from("c")]);

        let ids: Vec<_> = RandomTrigger::candidates(&utilities, &touched)
            .map(|utility| utility.id.0.as_str())
            .collect();
        assert_eq!(ids, vec!["a"]);
    }
}
