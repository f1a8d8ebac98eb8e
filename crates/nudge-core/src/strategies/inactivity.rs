//! Inactivity timeout.

use chrono::{DateTime, Utc};
use tracing::warn;

use super::{until, NextFire, Strategy};
use crate::config::SchedulerConfig;
use crate::types::{RuntimeState, TriggerMode};

/// Fires once the user has been silent for the configured threshold, then
/// again every threshold while the silence lasts.
///
/// User input does not reach the strategy directly: the coordinator replaces
/// the armed runner on every input, which debounces the timer.
#[derive(Debug, Clone, Default)]
pub struct InactivityStrategy {
    last_fired: Option<DateTime<Utc>>,
}

impl InactivityStrategy {
    pub fn new() -> Self {
        Self::default()
    }

    /// When the strategy should fire, given the last user input. `None` when
    /// the threshold reaches past the representable calendar.
    pub fn deadline(
        &self,
        config: &SchedulerConfig,
        last_input: DateTime<Utc>,
    ) -> Option<DateTime<Utc>> {
        let anchor = match self.last_fired {
            Some(fired) if fired > last_input => fired,
            _ => last_input,
        };
        chrono::Duration::from_std(config.idle_threshold(TriggerMode::Inactivity))
            .ok()
            .and_then(|threshold| anchor.checked_add_signed(threshold))
    }
}

impl Strategy for InactivityStrategy {
    fn mode(&self) -> TriggerMode {
        TriggerMode::Inactivity
    }

    fn next_fire(
        &mut self,
        config: &SchedulerConfig,
        state: &RuntimeState,
        now: DateTime<Utc>,
    ) -> NextFire {
        if !config.is_active(TriggerMode::Inactivity) {
            return NextFire::Stop;
        }
        match self.deadline(config, state.last_user_input_at) {
            Some(at) => NextFire::After(until(now, at)),
            None => {
                warn!("Inactivity threshold out of range, not arming");
                NextFire::Stop
            }
        }
    }

    fn on_fired(&mut self, at: DateTime<Utc>) {
        self.last_fired = Some(at);
    }
}
