//! Mutable runtime state shared by the strategies and the gate.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Duration;

/// Shared scheduler state. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuntimeState {
    /// When the gate last appended an automated message.
    pub last_auto_message_at: Option<DateTime<Utc>>,
    /// Most recent user-originated input.
    pub last_user_input_at: DateTime<Utc>,
    /// Automated sends since the last user activity or conversation change.
    pub use_count: u32,
    /// Incremented on every stop; triggers armed in an older epoch are stale.
    pub epoch: u64,
}

impl RuntimeState {
    /// Fresh state; the user counts as active at `now`.
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            last_auto_message_at: None,
            last_user_input_at: now,
            use_count: 0,
            epoch: 0,
        }
    }

    /// How long the user has been idle. Clamped at zero.
    pub fn idle_for(&self, now: DateTime<Utc>) -> Duration {
        (now - self.last_user_input_at).to_std().unwrap_or_default()
    }

    /// Time since the last automated message, `None` if there never was one.
    pub fn since_last_auto_message(&self, now: DateTime<Utc>) -> Option<Duration> {
        self.last_auto_message_at
            .map(|at| (now - at).to_std().unwrap_or_default())
    }

    /// Record user input: updates the activity time and resets the use count.
    pub fn record_user_input(&mut self, now: DateTime<Utc>) {
        self.last_user_input_at = now;
        self.use_count = 0;
    }

    /// Record a successful automated send.
    pub fn record_send(&mut self, now: DateTime<Utc>) {
        self.use_count = self.use_count.saturating_add(1);
        self.last_auto_message_at = Some(now);
    }

    pub fn reset_uses(&mut self) {
        self.use_count = 0;
    }

    /// Invalidate every trigger armed so far and return the new epoch.
    pub fn advance_epoch(&mut self) -> u64 {
        self.epoch = self.epoch.wrapping_add(1);
        self.epoch
    }
}
