//! Random interval between sends.

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::Duration;

use super::{NextFire, Strategy};
use crate::config::SchedulerConfig;
use crate::types::{RuntimeState, TriggerMode};

/// Draw a whole-second delay uniformly from `[min, max]`.
///
/// `min` is raised to 1 so a zero delay is never produced, and `max` is raised
/// to `min` so inverted bounds still yield a value.
pub fn sample_delay<R: Rng>(rng: &mut R, min_seconds: u64, max_seconds: u64) -> Duration {
    let lo = min_seconds.max(1);
    let hi = max_seconds.max(lo);
    Duration::from_secs(rng.gen_range(lo..=hi))
}

/// Fires after a fresh random delay each cycle.
#[derive(Debug)]
pub struct RandomIntervalStrategy {
    rng: StdRng,
}

impl RandomIntervalStrategy {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    /// Use a specific RNG, e.g. a seeded one.
    pub fn with_rng(rng: StdRng) -> Self {
        Self { rng }
    }
}

impl Default for RandomIntervalStrategy {
    fn default() -> Self {
        Self::new()
    }
}

impl Strategy for RandomIntervalStrategy {
    fn mode(&self) -> TriggerMode {
        TriggerMode::Random
    }

    fn next_fire(
        &mut self,
        config: &SchedulerConfig,
        _state: &RuntimeState,
        _now: DateTime<Utc>,
    ) -> NextFire {
        if !config.is_active(TriggerMode::Random) {
            return NextFire::Stop;
        }
        let random = &config.random_mode;
        NextFire::After(sample_delay(
            &mut self.rng,
            random.min_interval_seconds,
            random.max_interval_seconds,
        ))
    }
}
