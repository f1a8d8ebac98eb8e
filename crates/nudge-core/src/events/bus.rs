//! Broadcast of scheduler events to any number of listeners.
//!
//! The scheduler never waits on a listener. A listener that falls more than
//! the channel capacity behind loses the oldest events.

use crate::events::SchedulerEvent;
use tokio::sync::broadcast::{self, error::RecvError};

/// Events buffered per listener.
const DEFAULT_CAPACITY: usize = 256;

/// Cheap to clone; every clone feeds the same channel. With no listeners
/// events go nowhere.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<SchedulerEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Bus buffering `capacity` events per listener (at least one).
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Subscribe to events emitted from now on
    pub fn subscribe(&self) -> EventSubscriber {
        EventSubscriber {
            receiver: self.sender.subscribe(),
        }
    }

    /// Publish `event`.
    pub fn emit(&self, event: SchedulerEvent) {
        // Err only means nobody is listening
        let _ = self.sender.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

/// Receiving end of an [`EventBus`].
pub struct EventSubscriber {
    receiver: broadcast::Receiver<SchedulerEvent>,
}

impl EventSubscriber {
    /// Next event, or `None` once every bus handle is dropped. A lagging
    /// listener skips what it missed.
    pub async fn recv(&mut self) -> Option<SchedulerEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => break Some(event),
                Err(RecvError::Closed) => break None,
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Event listener fell behind");
                }
            }
        }
    }

    /// Next queued event, without waiting.
    pub fn try_recv(&mut self) -> Option<SchedulerEvent> {
        self.receiver.try_recv().ok()
    }

    /// Drain every event currently queued
    pub fn drain(&mut self) -> Vec<SchedulerEvent> {
        std::iter::from_fn(|| self.try_recv()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TriggerMode;

    #[tokio::test]
    async fn test_fired_event_reaches_listener() {
        let events = EventBus::new();
        let mut listener = events.subscribe();

        events.emit(SchedulerEvent::Fired {
            mode: TriggerMode::Fixed,
        });

        let event = listener.recv().await.unwrap();
        assert_eq!(event.mode(), Some(TriggerMode::Fixed));
    }

    #[tokio::test]
    async fn test_every_listener_sees_stop() {
        let events = EventBus::new();
        let mut first = events.subscribe();
        let mut second = events.clone().subscribe();

        events.emit(SchedulerEvent::Stopped);

        assert_eq!(first.recv().await.unwrap().event_type(), "scheduler.stopped");
        assert_eq!(second.recv().await.unwrap().event_type(), "scheduler.stopped");
    }

    #[test]
    fn test_emit_without_listeners() {
        let events = EventBus::new();
        events.emit(SchedulerEvent::Stopped);
        assert_eq!(events.subscriber_count(), 0);
    }

    #[test]
    fn test_drain() {
        let events = EventBus::new();
        let mut listener = events.subscribe();
        events.emit(SchedulerEvent::Stopped);
        events.emit(SchedulerEvent::Fired {
            mode: TriggerMode::Random,
        });
        assert_eq!(listener.drain().len(), 2);
        assert!(listener.try_recv().is_none());
    }
}
