#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use nudge_core::{
    AnchoredClock, Conversation, EventSubscriber, GenerationRequest, GenerationResponse,
    GenerationService, Host, InMemoryConversationStore, Message, NudgeError, NudgeResult,
    ProactiveScheduler, RejectReason, SchedulerConfig, SchedulerEvent, TriggerMode,
};

/// Replies "reply N", or fails every call when `failing`.
#[derive(Debug, Default)]
pub struct CountingGenerator {
    calls: AtomicUsize,
    failing: bool,
}

impl CountingGenerator {
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Default::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GenerationService for CountingGenerator {
    async fn generate(&self, _request: GenerationRequest) -> NudgeResult<GenerationResponse> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.failing {
            return Err(NudgeError::generation("provider unavailable"));
        }
        Ok(GenerationResponse::new(format!("reply {}", n)))
    }

    fn model_name(&self) -> &str {
        "counting"
    }
}

pub fn wall(h: u32, m: u32, s: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 14, h, m, s).unwrap()
}

/// A config with every mode off and no gating; tests switch on what they need.
pub fn quiet_config() -> SchedulerConfig {
    let mut config = SchedulerConfig::default();
    config.fixed_mode.enabled = false;
    config.fixed_mode.utc_offset_minutes = Some(0);
    config.random_mode.enabled = false;
    config.inactivity_mode.enabled = false;
    config.only_when_idle = false;
    config.min_message_gap_seconds = 0;
    config
}

pub struct Harness {
    pub scheduler: ProactiveScheduler,
    pub store: Arc<InMemoryConversationStore>,
    pub generator: Arc<CountingGenerator>,
    pub start: DateTime<Utc>,
    events: EventSubscriber,
    log: Vec<SchedulerEvent>,
}

impl Harness {
    /// Scheduler over a conversation holding one user message, clock at noon.
    pub fn new(config: SchedulerConfig) -> Self {
        Self::build(config, wall(12, 0, 0), true, CountingGenerator::default())
    }

    pub fn build(
        config: SchedulerConfig,
        start: DateTime<Utc>,
        seeded: bool,
        generator: CountingGenerator,
    ) -> Self {
        let store = Arc::new(InMemoryConversationStore::new());
        let mut conversation = Conversation::with_id("main");
        if seeded {
            conversation = conversation.with_message(Message::user("hi there", start));
        }
        store.open(conversation);

        let generator = Arc::new(generator);
        let host = Host::new(store.clone(), generator.clone())
            .with_clock(Arc::new(AnchoredClock::new(start)));
        let scheduler = ProactiveScheduler::new(config, host);
        let events = scheduler.subscribe();

        Self {
            scheduler,
            store,
            generator,
            start,
            events,
            log: Vec::new(),
        }
    }

    /// Collect everything emitted so far.
    pub fn pump(&mut self) -> &[SchedulerEvent] {
        let fresh = self.events.drain();
        self.log.extend(fresh);
        &self.log
    }

    /// Sent messages in order.
    pub fn sent(&mut self) -> Vec<Message> {
        self.pump()
            .iter()
            .filter_map(|e| match e {
                SchedulerEvent::Sent { message, .. } => Some(message.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn rejections(&mut self) -> Vec<RejectReason> {
        self.pump()
            .iter()
            .filter_map(|e| match e {
                SchedulerEvent::Rejected { reason, .. } => Some(reason.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn fired(&mut self, mode: TriggerMode) -> usize {
        self.pump()
            .iter()
            .filter(|e| matches!(e, SchedulerEvent::Fired { mode: m } if *m == mode))
            .count()
    }

    pub fn count(&mut self, event_type: &str) -> usize {
        self.pump()
            .iter()
            .filter(|e| e.event_type() == event_type)
            .count()
    }

    /// Seconds since the harness start at which `message` was sent.
    pub fn offset_secs(&self, message: &Message) -> i64 {
        (message.timestamp - self.start).num_seconds()
    }
}

pub async fn advance(secs: u64) {
    tokio::time::sleep(Duration::from_secs(secs)).await;
}

pub async fn advance_millis(millis: u64) {
    tokio::time::sleep(Duration::from_millis(millis)).await;
}
