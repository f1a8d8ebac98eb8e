//! nudge-core - Core library for nudge.
//!
//! A proactive message scheduler: it decides when an assistant should speak
//! up in a conversation without being asked, and keeps it from spamming.
//! Three strategies produce triggers (fixed daily times, random intervals,
//! user inactivity); one gate decides whether a trigger becomes a message.
//!
//! # Example
//!
//! ```ignore
//! use nudge_core::{Host, InMemoryConversationStore, ProactiveScheduler, SchedulerConfig};
//!
//! let conversations = Arc::new(InMemoryConversationStore::new());
//! let host = Host::new(conversations.clone(), generator);
//! let scheduler = ProactiveScheduler::new(SchedulerConfig::default(), host);
//!
//! let mut events = scheduler.subscribe();
//! scheduler.start()?;
//!
//! while let Some(event) = events.recv().await {
//!     if let SchedulerEvent::Sent { message, .. } = event {
//!         println!("{}", message.content);
//!     }
//! }
//! ```

pub mod activity;
pub mod config;
pub mod context;
pub mod error;
pub mod events;
pub mod gate;
mod persist;
pub mod scheduler;
pub mod store;
pub mod strategies;
pub mod timer;
pub mod traits;
pub mod types;

#[cfg(test)]
mod testing;

// Re-export commonly used types
pub use activity::ActivityTracker;
pub use config::{
    GeneratorProvider, NudgeConfig, ProviderConfig, SchedulerConfig, TimePoint,
};
pub use context::{Host, SchedulerContext};
pub use error::{ErrorCode, NudgeError, NudgeResult};
pub use events::{EventBus, EventSubscriber, SchedulerEvent};
pub use gate::{Dispatcher, RejectReason, SendOutcome};
pub use scheduler::{HostSignal, ProactiveScheduler};
pub use store::{FileConfigStore, InMemoryConversationStore};
pub use timer::{AnchoredClock, Clock, SystemClock, TimerHandle};
pub use traits::{
    ConfigStore, ConversationStore, GenerationParameters, GenerationRequest, GenerationResponse,
    GenerationService, TokenUsage,
};
pub use types::{Conversation, Message, MessageRole, RuntimeState, TriggerMode};
