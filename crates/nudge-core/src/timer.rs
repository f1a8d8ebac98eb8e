//! Clock and cancellable timer primitives.
//!
//! Strategies never read the system time directly; they go through a
//! [`Clock`] so tests can drive time with tokio's paused clock.

use chrono::{DateTime, Utc};
use std::future::Future;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::{NudgeError, NudgeResult};

/// Source of wall-clock time.
pub trait Clock: Send + Sync + std::fmt::Debug {
    fn now(&self) -> DateTime<Utc>;
}

/// The system wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Wall clock pinned to a start time and advanced by tokio's monotonic clock.
///
/// Under `#[tokio::test(start_paused = true)]` this moves in lockstep with
/// `tokio::time::sleep`, which makes timer tests deterministic.
#[derive(Debug, Clone)]
pub struct AnchoredClock {
    wall: DateTime<Utc>,
    anchor: tokio::time::Instant,
}

impl AnchoredClock {
    /// Anchor `wall` to the current tokio instant.
    pub fn new(wall: DateTime<Utc>) -> Self {
        Self {
            wall,
            anchor: tokio::time::Instant::now(),
        }
    }
}

impl Clock for AnchoredClock {
    fn now(&self) -> DateTime<Utc> {
        let elapsed = chrono::Duration::from_std(self.anchor.elapsed())
            .unwrap_or_else(|_| chrono::Duration::zero());
        self.wall + elapsed
    }
}

/// How a cancellable wait ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wait {
    Elapsed,
    Cancelled,
}

/// Sleep for `delay` unless `token` is cancelled first.
pub async fn wait(delay: Duration, token: &CancellationToken) -> Wait {
    tokio::select! {
        biased;
        _ = token.cancelled() => Wait::Cancelled,
        _ = tokio::time::sleep(delay) => Wait::Elapsed,
    }
}

/// Handle to a cancellable background task.
///
/// Cancelling stops the task at its next cancellation point; work already in
/// progress (a send that is awaiting the generation service) runs to
/// completion. Dropping the handle cancels it.
#[derive(Debug)]
pub struct TimerHandle {
    token: CancellationToken,
    task: JoinHandle<()>,
}

impl TimerHandle {
    /// Spawn `body` with a fresh cancellation token.
    ///
    /// Fails when called outside a tokio runtime.
    pub fn spawn<F, Fut>(body: F) -> NudgeResult<Self>
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|_| NudgeError::no_runtime("TimerHandle::spawn"))?;
        let token = CancellationToken::new();
        let task = runtime.spawn(body(token.clone()));
        Ok(Self { token, task })
    }

    /// Run `callback` once after `delay`, unless cancelled first.
    pub fn after<F, Fut>(delay: Duration, callback: F) -> NudgeResult<Self>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        Self::spawn(move |token| async move {
            if wait(delay, &token).await == Wait::Elapsed {
                callback().await;
            }
        })
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Whether the task has run to completion.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Live means neither cancelled nor finished.
    pub fn is_live(&self) -> bool {
        !self.is_cancelled() && !self.is_finished()
    }
}

impl Drop for TimerHandle {
    fn drop(&mut self) {
        self.token.cancel();
    }
}
