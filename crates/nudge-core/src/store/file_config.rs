//! Settings persisted in the nudge config file.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

use crate::config::{NudgeConfig, SchedulerConfig};
use crate::error::NudgeResult;
use crate::traits::ConfigStore;

/// Stores the `[scheduler]` table of a nudge config file. Other tables in
/// the file are preserved on save.
///
/// Clones share one write lock, so saves through any of them never
/// interleave their read-modify-write of the file.
#[derive(Debug, Clone)]
pub struct FileConfigStore {
    path: PathBuf,
    write_lock: Arc<Mutex<()>>,
}

impl FileConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Store at [`NudgeConfig::default_path`].
    pub fn at_default_path() -> Self {
        Self::new(NudgeConfig::default_path())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl ConfigStore for FileConfigStore {
    async fn load(&self) -> NudgeResult<Option<SchedulerConfig>> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "No saved settings");
            return Ok(None);
        }
        Ok(Some(NudgeConfig::from_file(&self.path)?.scheduler))
    }

    async fn save(&self, config: &SchedulerConfig) -> NudgeResult<()> {
        let _guard = self.write_lock.lock().await;
        let mut file = if self.path.exists() {
            NudgeConfig::from_file(&self.path)?
        } else {
            NudgeConfig::default()
        };
        file.scheduler = config.clone();
        file.save_to_file(&self.path)?;
        debug!(path = %self.path.display(), "Saved scheduler settings");
        Ok(())
    }
}
