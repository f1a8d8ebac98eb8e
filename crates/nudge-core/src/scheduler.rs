//! Scheduler coordinator.
//!
//! Owns the lifecycle of every strategy timer. Starting always cancels what
//! is armed first, so there is never more than one live timer per mode and a
//! restart leaves exactly the timers a single start would.

use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::mpsc;
use tracing::{debug, error, info};

use crate::activity::ActivityTracker;
use crate::config::SchedulerConfig;
use crate::context::{Host, SchedulerContext};
use crate::error::{NudgeError, NudgeResult};
use crate::events::{EventBus, EventSubscriber, SchedulerEvent};
use crate::gate::{Dispatcher, SendOutcome};
use crate::persist::SettingsWriter;
use crate::strategies::{spawn_runner, strategy_for};
use crate::timer::TimerHandle;
use crate::types::{RuntimeState, TriggerMode};

/// Every mode, in arming order.
const MODES: [TriggerMode; 3] = [TriggerMode::Fixed, TriggerMode::Random, TriggerMode::Inactivity];

/// Signals a host can feed to [`ProactiveScheduler::run_signals`].
#[derive(Debug, Clone)]
pub enum HostSignal {
    /// The user typed, tapped or sent something.
    UserInput,
    /// The host switched to another conversation.
    ConversationChanged,
    /// New settings from the host UI.
    UpdateConfig(Box<SchedulerConfig>),
    /// Master switch.
    SetEnabled(bool),
    /// Run the gate right away for a mode.
    TriggerNow(TriggerMode),
}

/// One optional timer per mode.
#[derive(Debug, Default)]
struct ActiveTimers {
    fixed: Option<TimerHandle>,
    random: Option<TimerHandle>,
    inactivity: Option<TimerHandle>,
    running: bool,
}

impl ActiveTimers {
    fn slot(&mut self, mode: TriggerMode) -> &mut Option<TimerHandle> {
        match mode {
            TriggerMode::Fixed => &mut self.fixed,
            TriggerMode::Random => &mut self.random,
            TriggerMode::Inactivity => &mut self.inactivity,
        }
    }

    fn get(&self, mode: TriggerMode) -> Option<&TimerHandle> {
        match mode {
            TriggerMode::Fixed => self.fixed.as_ref(),
            TriggerMode::Random => self.random.as_ref(),
            TriggerMode::Inactivity => self.inactivity.as_ref(),
        }
    }

    /// Cancel and drop every handle; returns how many were live.
    fn cancel_all(&mut self) -> usize {
        let mut cancelled = 0;
        for mode in MODES {
            if let Some(handle) = self.slot(mode).take() {
                if handle.is_live() {
                    cancelled += 1;
                }
                handle.cancel();
            }
        }
        cancelled
    }

    fn armed(&self) -> Vec<TriggerMode> {
        MODES
            .into_iter()
            .filter(|mode| self.get(*mode).is_some_and(TimerHandle::is_live))
            .collect()
    }
}

/// Proactive message scheduler.
///
/// # Example
///
/// ```ignore
/// use nudge_core::{Host, ProactiveScheduler, SchedulerConfig};
///
/// let host = Host::new(conversations, generator);
/// let scheduler = ProactiveScheduler::new(SchedulerConfig::default(), host);
/// scheduler.start()?;
///
/// // wire host events
/// scheduler.record_user_input()?;
/// scheduler.conversation_changed()?;
///
/// scheduler.stop();
/// ```
pub struct ProactiveScheduler {
    ctx: Arc<SchedulerContext>,
    dispatcher: Dispatcher,
    activity: ActivityTracker,
    timers: Mutex<ActiveTimers>,
    settings: Option<SettingsWriter>,
}

impl ProactiveScheduler {
    /// Create a stopped scheduler. Call [`start`](Self::start) to arm it.
    pub fn new(config: SchedulerConfig, host: Host) -> Self {
        Self::with_events(config, host, EventBus::new())
    }

    /// Create a stopped scheduler publishing to an existing event bus.
    pub fn with_events(config: SchedulerConfig, host: Host, events: EventBus) -> Self {
        let ctx = Arc::new(SchedulerContext::new(config.normalized(), host, events));
        Self {
            dispatcher: Dispatcher::new(ctx.clone()),
            activity: ActivityTracker::new(ctx.clone()),
            timers: Mutex::new(ActiveTimers::default()),
            settings: host_settings_writer(&ctx),
            ctx,
        }
    }

    /// Create a scheduler from the host's saved settings, or the defaults
    /// when nothing was saved. Saved settings are repaired where possible.
    pub async fn from_store(host: Host) -> NudgeResult<Self> {
        let config = match &host.config_store {
            Some(store) => match store.load().await? {
                Some(saved) => {
                    debug!("Loaded saved scheduler settings");
                    saved
                }
                None => SchedulerConfig::default(),
            },
            None => SchedulerConfig::default(),
        };
        Ok(Self::new(config, host))
    }

    fn timers(&self) -> std::sync::MutexGuard<'_, ActiveTimers> {
        self.timers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Arm every enabled mode, cancelling whatever was armed before.
    ///
    /// Returns the armed modes. Fails outside a tokio runtime.
    pub fn start(&self) -> NudgeResult<Vec<TriggerMode>> {
        tokio::runtime::Handle::try_current()
            .map_err(|_| NudgeError::no_runtime("ProactiveScheduler::start"))?;

        let mut timers = self.timers();
        let epoch = self.halt(&mut timers);
        let config = self.ctx.config();

        timers.running = true;
        if !config.enabled {
            info!("Scheduler disabled, nothing armed");
            self.ctx.emit(SchedulerEvent::Started { modes: Vec::new() });
            return Ok(Vec::new());
        }

        let mut armed = Vec::new();
        for mode in MODES.into_iter().filter(|m| config.is_active(*m)) {
            *timers.slot(mode) = Some(spawn_runner(strategy_for(mode), self.ctx.clone(), epoch)?);
            armed.push(mode);
        }

        info!(modes = ?armed, epoch, "Scheduler started");
        self.ctx.emit(SchedulerEvent::Started {
            modes: armed.clone(),
        });
        Ok(armed)
    }

    /// Cancel every timer. Triggers already at the gate finish; triggers
    /// that wake later are rejected as stale.
    pub fn stop(&self) {
        let mut timers = self.timers();
        timers.running = false;
        let epoch = self.halt(&mut timers);
        debug!(epoch, "Scheduler stopped");
        self.ctx.emit(SchedulerEvent::Stopped);
    }

    /// Stop, then start.
    pub fn restart(&self) -> NudgeResult<Vec<TriggerMode>> {
        self.stop();
        self.start()
    }

    /// Cancel all timers and open a new epoch, returning it.
    fn halt(&self, timers: &mut ActiveTimers) -> u64 {
        let cancelled = timers.cancel_all();
        let epoch = self.ctx.with_state(RuntimeState::advance_epoch);
        if cancelled > 0 {
            debug!(cancelled, epoch, "Cancelled armed timers");
        }
        epoch
    }

    /// Whether [`start`](Self::start) was called without a later [`stop`](Self::stop).
    pub fn is_running(&self) -> bool {
        self.timers().running
    }

    /// Modes with a live timer.
    pub fn armed_modes(&self) -> Vec<TriggerMode> {
        self.timers().armed()
    }

    /// Record user input: refreshes the idle clock, resets the use count and
    /// re-arms the inactivity timer from now.
    pub fn record_user_input(&self) -> NudgeResult<()> {
        self.activity.record();

        let mut timers = self.timers();
        if !timers.running || !self.ctx.config().is_active(TriggerMode::Inactivity) {
            return Ok(());
        }
        let epoch = self.ctx.with_state(|s| s.epoch);
        let slot = timers.slot(TriggerMode::Inactivity);
        if let Some(previous) = slot.take() {
            previous.cancel();
        }
        *slot = Some(spawn_runner(
            strategy_for(TriggerMode::Inactivity),
            self.ctx.clone(),
            epoch,
        )?);
        Ok(())
    }

    /// The host switched conversations: resets the use count and restarts.
    pub fn conversation_changed(&self) -> NudgeResult<()> {
        self.ctx.with_state(RuntimeState::reset_uses);
        debug!("Conversation changed");
        if self.is_running() {
            self.restart()?;
        }
        Ok(())
    }

    /// Install new settings, persist them and restart.
    ///
    /// Invalid settings are rejected and the current ones stay in effect.
    /// Saves run in the background, one at a time, and the store always ends
    /// on the newest settings. A failed save is only logged.
    pub fn update_config(&self, config: SchedulerConfig) -> NudgeResult<()> {
        config.validate()?;
        let config = config.normalized();

        {
            // install and queue together so memory and store agree on order
            let _timers = self.timers();
            if let Some(writer) = &self.settings {
                writer.submit(config.clone());
            }
            self.ctx.replace_config(config);
        }
        self.ctx.emit(SchedulerEvent::ConfigUpdated);
        info!("Scheduler settings updated");

        if self.is_running() {
            self.restart()?;
        }
        Ok(())
    }

    /// Flip the master switch.
    pub fn set_enabled(&self, enabled: bool) -> NudgeResult<()> {
        let mut config = (*self.ctx.config()).clone();
        config.enabled = enabled;
        self.update_config(config)
    }

    /// Run the gate for `mode` now, outside any timer.
    pub async fn trigger_now(&self, mode: TriggerMode) -> SendOutcome {
        self.dispatcher.try_send(mode).await
    }

    /// Apply one host signal.
    pub async fn handle_signal(&self, signal: HostSignal) -> NudgeResult<()> {
        match signal {
            HostSignal::UserInput => self.record_user_input(),
            HostSignal::ConversationChanged => self.conversation_changed(),
            HostSignal::UpdateConfig(config) => self.update_config(*config),
            HostSignal::SetEnabled(enabled) => self.set_enabled(enabled),
            HostSignal::TriggerNow(mode) => {
                self.trigger_now(mode).await;
                Ok(())
            }
        }
    }

    /// Apply host signals until the sender side is dropped.
    pub async fn run_signals(&self, mut signals: mpsc::Receiver<HostSignal>) {
        while let Some(signal) = signals.recv().await {
            if let Err(e) = self.handle_signal(signal).await {
                error!(error = %e, "Failed to apply host signal");
            }
        }
        debug!("Host signal channel closed");
    }

    /// Current settings.
    pub fn config(&self) -> Arc<SchedulerConfig> {
        self.ctx.config()
    }

    /// Copy of the runtime state.
    pub fn state(&self) -> RuntimeState {
        self.ctx.state()
    }

    pub fn activity(&self) -> &ActivityTracker {
        &self.activity
    }

    /// Subscribe to scheduler events.
    pub fn subscribe(&self) -> EventSubscriber {
        self.ctx.events().subscribe()
    }
}

impl Drop for ProactiveScheduler {
    fn drop(&mut self) {
        self.timers().cancel_all();
    }
}

fn host_settings_writer(ctx: &SchedulerContext) -> Option<SettingsWriter> {
    ctx.host().config_store.clone().map(SettingsWriter::new)
}

impl std::fmt::Debug for ProactiveScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProactiveScheduler")
            .field("ctx", &self.ctx)
            .field("armed", &self.armed_modes())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryConversationStore;
    use crate::testing::ScriptedGenerator;
    use crate::timer::AnchoredClock;
    use chrono::Utc;

    fn scheduler(config: SchedulerConfig) -> ProactiveScheduler {
        let host = Host::new(
            Arc::new(InMemoryConversationStore::new()),
            Arc::new(ScriptedGenerator::replying("hello")),
        )
        .with_clock(Arc::new(AnchoredClock::new(Utc::now())));
        ProactiveScheduler::new(config, host)
    }

    fn all_modes() -> SchedulerConfig {
        let mut config = SchedulerConfig::default();
        config.random_mode.enabled = true;
        config.inactivity_mode.enabled = true;
        config
    }

    #[test]
    fn test_start_outside_runtime_fails() {
        let s = scheduler(SchedulerConfig::default());
        assert!(s.start().is_err());
        assert!(s.armed_modes().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_arms_enabled_modes() {
        let s = scheduler(all_modes());
        let armed = s.start().unwrap();
        assert_eq!(armed, MODES.to_vec());
        assert_eq!(s.armed_modes(), MODES.to_vec());
        assert!(s.is_running());

        s.stop();
        assert!(s.armed_modes().is_empty());
        assert!(!s.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_is_idempotent() {
        let s = scheduler(all_modes());
        s.start().unwrap();
        let once = s.armed_modes();
        s.restart().unwrap();
        s.restart().unwrap();
        assert_eq!(s.armed_modes(), once);
        assert_eq!(s.state().epoch, 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_disabled_scheduler_arms_nothing() {
        let mut config = all_modes();
        config.enabled = false;
        let s = scheduler(config);
        assert!(s.start().unwrap().is_empty());
        assert!(s.armed_modes().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_set_enabled_toggles_timers() {
        let s = scheduler(SchedulerConfig::default());
        s.start().unwrap();
        assert_eq!(s.armed_modes(), vec![TriggerMode::Fixed]);

        s.set_enabled(false).unwrap();
        assert!(s.armed_modes().is_empty());

        s.set_enabled(true).unwrap();
        assert_eq!(s.armed_modes(), vec![TriggerMode::Fixed]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalid_update_keeps_current_config() {
        let s = scheduler(SchedulerConfig::default());
        let mut bad = SchedulerConfig::default();
        bad.prompts.clear();
        assert!(s.update_config(bad).is_err());
        assert_eq!(s.config().prompts.len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_conversation_change_resets_uses() {
        let s = scheduler(SchedulerConfig::default());
        s.start().unwrap();
        s.ctx.with_state(|st| st.use_count = 4);
        s.conversation_changed().unwrap();
        assert_eq!(s.state().use_count, 0);
        assert_eq!(s.armed_modes(), vec![TriggerMode::Fixed]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_input_while_stopped_arms_nothing() {
        let mut config = SchedulerConfig::default();
        config.inactivity_mode.enabled = true;
        let s = scheduler(config);
        s.record_user_input().unwrap();
        assert!(s.armed_modes().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_signals() {
        let s = scheduler(SchedulerConfig::default());
        s.start().unwrap();
        let (tx, rx) = mpsc::channel(8);
        tx.send(HostSignal::SetEnabled(false)).await.unwrap();
        tx.send(HostSignal::UserInput).await.unwrap();
        drop(tx);

        s.run_signals(rx).await;
        assert!(!s.config().enabled);
        assert!(s.armed_modes().is_empty());
    }
}
