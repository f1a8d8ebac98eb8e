//! Settings persistence trait.

use async_trait::async_trait;

use crate::config::SchedulerConfig;
use crate::error::NudgeResult;

/// Persists scheduler settings between runs.
#[async_trait]
pub trait ConfigStore: Send + Sync {
    /// Saved settings, or `None` when nothing was saved yet.
    async fn load(&self) -> NudgeResult<Option<SchedulerConfig>>;

    async fn save(&self, config: &SchedulerConfig) -> NudgeResult<()>;
}
