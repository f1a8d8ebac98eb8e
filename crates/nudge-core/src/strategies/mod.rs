//! Trigger strategies.
//!
//! A strategy only answers "when should I fire next?". The runner in this
//! module owns the timer and drives every strategy through the same cycle:
//!
//! ```text
//! Idle -> Armed -> Fired -> Armed ...
//!   \        \
//!    +--------+--> Stopped
//! ```

mod fixed;
mod inactivity;
mod random;

pub use fixed::{next_fixed_time, FixedTimeStrategy};
pub use inactivity::InactivityStrategy;
pub use random::{sample_delay, RandomIntervalStrategy};

use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace, warn};

use crate::config::SchedulerConfig;
use crate::context::SchedulerContext;
use crate::error::NudgeResult;
use crate::events::SchedulerEvent;
use crate::gate::{Dispatcher, Origin};
use crate::timer::{wait, TimerHandle, Wait};
use crate::types::{RuntimeState, TriggerMode};

/// Delay before recomputing when no fire time can be determined.
pub const RETRY_BACKOFF: Duration = Duration::from_secs(10);

/// What a strategy wants to happen next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextFire {
    /// Fire after the delay.
    After(Duration),
    /// Nothing to fire yet; ask again after the delay.
    Recheck(Duration),
    /// The mode is off; end the chain.
    Stop,
}

/// Computes fire times for one trigger mode.
pub trait Strategy: Send + 'static {
    fn mode(&self) -> TriggerMode;

    /// Decide the next step from the current configuration and state.
    fn next_fire(
        &mut self,
        config: &SchedulerConfig,
        state: &RuntimeState,
        now: DateTime<Utc>,
    ) -> NextFire;

    /// Called when the timer elapses, before the trigger reaches the gate.
    fn on_fired(&mut self, _at: DateTime<Utc>) {}
}

/// Build the strategy for `mode`.
pub fn strategy_for(mode: TriggerMode) -> Box<dyn Strategy> {
    match mode {
        TriggerMode::Fixed => Box::new(FixedTimeStrategy),
        TriggerMode::Random => Box::new(RandomIntervalStrategy::new()),
        TriggerMode::Inactivity => Box::new(InactivityStrategy::new()),
    }
}

#[derive(Debug, Clone, Copy)]
enum Phase {
    Idle,
    Armed(Duration),
    Waiting(Duration),
    Fired,
    Stopped,
}

/// Spawn the timer task for `strategy`. Triggers carry `epoch` so the gate
/// can drop them once a newer start has taken over.
pub(crate) fn spawn_runner(
    mut strategy: Box<dyn Strategy>,
    ctx: Arc<SchedulerContext>,
    epoch: u64,
) -> NudgeResult<TimerHandle> {
    let dispatcher = Dispatcher::new(ctx.clone());
    TimerHandle::spawn(move |token| async move {
        let mode = strategy.mode();
        let mut phase = Phase::Idle;

        loop {
            phase = match phase {
                Phase::Idle | Phase::Fired if token.is_cancelled() => Phase::Stopped,
                Phase::Idle | Phase::Fired => {
                    let config = ctx.config();
                    let state = ctx.state();
                    let now = ctx.now();
                    match strategy.next_fire(&config, &state, now) {
                        NextFire::After(delay) => match fire_time(now, delay) {
                            Some(fires_at) => {
                                debug!(
                                    mode = %mode,
                                    delay_secs = delay.as_secs(),
                                    fires_at = %fires_at,
                                    "Strategy armed"
                                );
                                ctx.emit(SchedulerEvent::Armed { mode, fires_at });
                                Phase::Armed(delay)
                            }
                            None => {
                                warn!(
                                    mode = %mode,
                                    delay_secs = delay.as_secs(),
                                    "Fire time out of range, not arming"
                                );
                                Phase::Stopped
                            }
                        },
                        NextFire::Recheck(delay) => {
                            trace!(
                                mode = %mode,
                                delay_secs = delay.as_secs(),
                                "Nothing to arm, rechecking later"
                            );
                            Phase::Waiting(delay)
                        }
                        NextFire::Stop => Phase::Stopped,
                    }
                }
                Phase::Armed(delay) => match wait(delay, &token).await {
                    Wait::Cancelled => Phase::Stopped,
                    Wait::Elapsed => {
                        strategy.on_fired(ctx.now());
                        ctx.emit(SchedulerEvent::Fired { mode });
                        dispatcher.dispatch(mode, Origin::Armed { epoch }).await;
                        Phase::Fired
                    }
                },
                Phase::Waiting(delay) => match wait(delay, &token).await {
                    Wait::Cancelled => Phase::Stopped,
                    Wait::Elapsed => Phase::Idle,
                },
                Phase::Stopped => break,
            };
        }

        debug!(mode = %mode, "Strategy stopped");
    })
}

/// `now + delay`, or `None` past the representable calendar.
pub(crate) fn fire_time(now: DateTime<Utc>, delay: Duration) -> Option<DateTime<Utc>> {
    chrono::Duration::from_std(delay)
        .ok()
        .and_then(|delay| now.checked_add_signed(delay))
}

/// Non-negative duration from `now` until `at`.
pub(crate) fn until(now: DateTime<Utc>, at: DateTime<Utc>) -> Duration {
    (at - now).to_std().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Host;
    use crate::events::EventBus;
    use crate::store::InMemoryConversationStore;
    use crate::testing::{fixed_clock, ScriptedGenerator};

    /// Always asks for a fire past the end of the calendar.
    struct BeyondCalendar;

    impl Strategy for BeyondCalendar {
        fn mode(&self) -> TriggerMode {
            TriggerMode::Random
        }

        fn next_fire(
            &mut self,
            _: &SchedulerConfig,
            _: &RuntimeState,
            _: DateTime<Utc>,
        ) -> NextFire {
            NextFire::After(Duration::from_secs(8_500_000_000_000))
        }
    }

    #[test]
    fn test_fire_time() {
        let now = Utc::now();
        assert_eq!(
            fire_time(now, Duration::from_secs(60)),
            Some(now + chrono::Duration::seconds(60))
        );
        assert_eq!(fire_time(now, Duration::from_secs(8_500_000_000_000)), None);
        assert_eq!(fire_time(now, Duration::MAX), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_runner_stops_when_fire_time_overflows() {
        let host = Host::new(
            Arc::new(InMemoryConversationStore::new()),
            Arc::new(ScriptedGenerator::replying("hi")),
        )
        .with_clock(fixed_clock());
        let ctx = Arc::new(SchedulerContext::new(
            SchedulerConfig::default(),
            host,
            EventBus::new(),
        ));
        let mut events = ctx.events().subscribe();

        let handle = spawn_runner(Box::new(BeyondCalendar), ctx, 0).unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert!(handle.is_finished());
        assert!(events.drain().is_empty());
    }
}
