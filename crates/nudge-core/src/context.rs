//! Shared scheduler context.
//!
//! One `SchedulerContext` is shared by the coordinator, the strategies and the
//! gate. Locks here are never held across an `.await`.

use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use crate::config::SchedulerConfig;
use crate::events::{EventBus, SchedulerEvent};
use crate::timer::{Clock, SystemClock};
use crate::traits::{ConfigStore, ConversationStore, GenerationService};
use crate::types::RuntimeState;

/// The host collaborators the scheduler drives.
#[derive(Clone)]
pub struct Host {
    pub conversations: Arc<dyn ConversationStore>,
    pub generator: Arc<dyn GenerationService>,
    pub config_store: Option<Arc<dyn ConfigStore>>,
    pub clock: Arc<dyn Clock>,
}

impl Host {
    /// Host with the system clock and no settings persistence.
    pub fn new(
        conversations: Arc<dyn ConversationStore>,
        generator: Arc<dyn GenerationService>,
    ) -> Self {
        Self {
            conversations,
            generator,
            config_store: None,
            clock: Arc::new(SystemClock),
        }
    }

    /// Persist configuration updates through `store`.
    pub fn with_config_store(mut self, store: Arc<dyn ConfigStore>) -> Self {
        self.config_store = Some(store);
        self
    }

    /// Use a different time source.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }
}

/// Configuration snapshot, runtime state and collaborators.
pub struct SchedulerContext {
    config: RwLock<Arc<SchedulerConfig>>,
    state: Mutex<RuntimeState>,
    host: Host,
    events: EventBus,
    /// Serializes sends so gate checks and state updates never interleave.
    pub(crate) send_lock: tokio::sync::Mutex<()>,
}

impl SchedulerContext {
    pub fn new(config: SchedulerConfig, host: Host, events: EventBus) -> Self {
        let state = RuntimeState::new(host.clock.now());
        Self {
            config: RwLock::new(Arc::new(config)),
            state: Mutex::new(state),
            host,
            events,
            send_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Current configuration snapshot.
    pub fn config(&self) -> Arc<SchedulerConfig> {
        self.config
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub(crate) fn replace_config(&self, config: SchedulerConfig) {
        *self.config.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(config);
    }

    /// Run `f` with exclusive access to the runtime state.
    pub fn with_state<R>(&self, f: impl FnOnce(&mut RuntimeState) -> R) -> R {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut state)
    }

    /// Copy of the runtime state.
    pub fn state(&self) -> RuntimeState {
        self.with_state(|s| s.clone())
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.host.clock.now()
    }

    pub fn host(&self) -> &Host {
        &self.host
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub(crate) fn emit(&self, event: SchedulerEvent) {
        self.events.emit(event);
    }
}

impl std::fmt::Debug for SchedulerContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchedulerContext")
            .field("config", &self.config())
            .field("state", &self.state())
            .field("generator", &self.host.generator.model_name())
            .finish()
    }
}
