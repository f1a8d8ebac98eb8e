//! Background writer for scheduler settings.

use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use crate::config::SchedulerConfig;
use crate::traits::ConfigStore;

/// Saves settings one at a time on a single task.
///
/// Only the newest submitted snapshot matters: snapshots submitted while a
/// save is in flight collapse into one follow-up save of the latest, so the
/// store always ends on the last value submitted.
pub(crate) struct SettingsWriter {
    store: Arc<dyn ConfigStore>,
    pending: watch::Sender<Option<Arc<SchedulerConfig>>>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl SettingsWriter {
    pub(crate) fn new(store: Arc<dyn ConfigStore>) -> Self {
        let (pending, _) = watch::channel(None);
        Self {
            store,
            pending,
            task: Mutex::new(None),
        }
    }

    /// Queue `config` for saving. The writer task starts on first use and
    /// needs a tokio runtime; without one nothing is saved.
    pub(crate) fn submit(&self, config: SchedulerConfig) {
        self.pending.send_replace(Some(Arc::new(config)));

        let mut task = self.task.lock().unwrap_or_else(PoisonError::into_inner);
        if task.is_some() {
            return;
        }
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                *task = Some(runtime.spawn(write_settings(
                    self.store.clone(),
                    self.pending.subscribe(),
                )));
            }
            Err(_) => warn!("No tokio runtime, scheduler settings not saved"),
        }
    }
}

/// Runs until the writer (and with it the sender) is dropped.
async fn write_settings(
    store: Arc<dyn ConfigStore>,
    mut pending: watch::Receiver<Option<Arc<SchedulerConfig>>>,
) {
    loop {
        let next = pending.borrow_and_update().clone();
        if let Some(config) = next {
            match store.save(&config).await {
                Ok(()) => debug!("Scheduler settings saved"),
                Err(e) => error!(error = %e, "Failed to save scheduler settings"),
            }
        }
        if pending.changed().await.is_err() {
            break;
        }
    }
}

impl std::fmt::Debug for SettingsWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SettingsWriter").finish_non_exhaustive()
    }
}
