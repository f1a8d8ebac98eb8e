//! Fixed daily time points.

use chrono::{DateTime, Days, FixedOffset, Local, TimeZone, Utc};

use super::{until, NextFire, Strategy, RETRY_BACKOFF};
use crate::config::{SchedulerConfig, TimePoint};
use crate::types::{RuntimeState, TriggerMode};

/// The earliest configured point strictly after `now`.
///
/// Points are compared at minute precision in `now`'s timezone; a point equal
/// to `now` counts as already passed, so the result is always in the future.
/// When every point has passed today the first point of the next day is
/// returned. Local times that do not exist (a DST gap) are skipped. Returns
/// `None` when there is no valid point.
pub fn next_fixed_time<Tz: TimeZone>(
    points: &[TimePoint],
    now: &DateTime<Tz>,
) -> Option<DateTime<Tz>> {
    let mut minutes: Vec<u32> = points
        .iter()
        .filter(|p| p.is_valid())
        .map(TimePoint::minute_of_day)
        .collect();
    minutes.sort_unstable();
    minutes.dedup();

    let tz = now.timezone();
    let today = now.date_naive();

    // Two extra days cover a point landing in a DST gap on the next day.
    for offset in 0..3 {
        let date = today.checked_add_days(Days::new(offset))?;
        for minute in &minutes {
            let Some(naive) = date.and_hms_opt(minute / 60, minute % 60, 0) else {
                continue;
            };
            if let Some(candidate) = tz.from_local_datetime(&naive).earliest() {
                if candidate > *now {
                    return Some(candidate);
                }
            }
        }
    }
    None
}

/// Fires at each configured time point, every day.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedTimeStrategy;

impl FixedTimeStrategy {
    /// Next fire instant in UTC, honouring the configured offset or local time.
    pub fn next_instant(config: &SchedulerConfig, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let points = &config.fixed_mode.times;
        match config.fixed_mode.utc_offset_minutes {
            Some(minutes) => {
                let tz = FixedOffset::east_opt(minutes.checked_mul(60)?)?;
                next_fixed_time(points, &now.with_timezone(&tz)).map(|t| t.with_timezone(&Utc))
            }
            None => {
                next_fixed_time(points, &now.with_timezone(&Local)).map(|t| t.with_timezone(&Utc))
            }
        }
    }
}

impl Strategy for FixedTimeStrategy {
    fn mode(&self) -> TriggerMode {
        TriggerMode::Fixed
    }

    fn next_fire(
        &mut self,
        config: &SchedulerConfig,
        _state: &RuntimeState,
        now: DateTime<Utc>,
    ) -> NextFire {
        if !config.is_active(TriggerMode::Fixed) {
            return NextFire::Stop;
        }
        match Self::next_instant(config, now) {
            Some(at) => NextFire::After(until(now, at)),
            None => NextFire::Recheck(RETRY_BACKOFF),
        }
    }
}
