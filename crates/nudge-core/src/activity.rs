//! User activity tracking.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tracing::trace;

use crate::context::SchedulerContext;

/// Records when the user last did something.
///
/// Any user-originated input counts: a sent message, typing, a tap. Each
/// record also starts a new use-count cycle.
#[derive(Debug, Clone)]
pub struct ActivityTracker {
    ctx: Arc<SchedulerContext>,
}

impl ActivityTracker {
    pub fn new(ctx: Arc<SchedulerContext>) -> Self {
        Self { ctx }
    }

    /// Record user input now and return the recorded time.
    pub fn record(&self) -> DateTime<Utc> {
        let now = self.ctx.now();
        self.ctx.with_state(|s| s.record_user_input(now));
        trace!(at = %now, "User input recorded");
        now
    }

    pub fn last_input(&self) -> DateTime<Utc> {
        self.ctx.with_state(|s| s.last_user_input_at)
    }

    /// How long the user has been idle.
    pub fn idle_for(&self) -> Duration {
        let now = self.ctx.now();
        self.ctx.with_state(|s| s.idle_for(now))
    }
}
