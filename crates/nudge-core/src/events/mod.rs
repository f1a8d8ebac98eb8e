//! Scheduler lifecycle events
//!
//! This module provides:
//! - Event types for each step a trigger goes through (armed, fired, sent, rejected, failed)
//! - Event bus for internal pub/sub

mod bus;
mod event;

pub use bus::{EventBus, EventSubscriber};
pub use event::SchedulerEvent;
