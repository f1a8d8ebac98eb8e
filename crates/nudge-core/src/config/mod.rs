//! Configuration system for nudge.
//!
//! A configuration file holds two tables: `[scheduler]` (what is sent and
//! when) and `[provider]` (which text generation service to call). Missing
//! keys fall back to their defaults, so a file only needs the overrides.

mod provider;
mod scheduler;

pub use provider::*;
pub use scheduler::*;

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{NudgeError, NudgeResult};
use crate::types::TriggerMode;

/// Supported configuration file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Toml,
    Json,
    Yaml,
}

impl ConfigFormat {
    /// Pick the format from a file extension.
    pub fn from_path(path: &Path) -> NudgeResult<Self> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => Ok(Self::Toml),
            Some("json") => Ok(Self::Json),
            Some("yaml" | "yml") => Ok(Self::Yaml),
            _ => Err(NudgeError::Configuration(
                "Unsupported config file format. Use .toml, .json, or .yaml".to_string(),
            )),
        }
    }

    pub fn parse<T: serde::de::DeserializeOwned>(&self, content: &str) -> NudgeResult<T> {
        match self {
            Self::Toml => Ok(toml::from_str(content)?),
            Self::Json => serde_json::from_str(content)
                .map_err(|e| NudgeError::Configuration(format!("Invalid JSON: {}", e))),
            Self::Yaml => Ok(serde_yaml::from_str(content)?),
        }
    }

    pub fn render<T: Serialize>(&self, value: &T) -> NudgeResult<String> {
        match self {
            Self::Toml => toml::to_string_pretty(value)
                .map_err(|e| NudgeError::Configuration(e.to_string())),
            Self::Json => Ok(serde_json::to_string_pretty(value)?),
            Self::Yaml => Ok(serde_yaml::to_string(value)?),
        }
    }
}

/// Complete nudge configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct NudgeConfig {
    pub scheduler: SchedulerConfig,
    pub provider: ProviderConfig,
}

impl NudgeConfig {
    /// Default config file location: `<config dir>/nudge/config.toml`.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .or_else(dirs::home_dir)
            .map(|d| d.join("nudge"))
            .unwrap_or_else(|| PathBuf::from(".nudge"))
            .join("config.toml")
    }

    /// Load configuration from a file (TOML, JSON, or YAML).
    pub fn from_file(path: impl AsRef<Path>) -> NudgeResult<Self> {
        let path = path.as_ref();
        let format = ConfigFormat::from_path(path)?;
        let content = std::fs::read_to_string(path).map_err(|e| {
            NudgeError::Configuration(format!("Cannot read {}: {}", path.display(), e))
        })?;
        format.parse(&content)
    }

    /// Write configuration to a file, creating parent directories.
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> NudgeResult<()> {
        let path = path.as_ref();
        let format = ConfigFormat::from_path(path)?;
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, format.render(self)?)?;
        Ok(())
    }

    /// Load configuration from environment variables over the defaults.
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// Apply `NUDGE_*` environment variables.
    ///
    /// Reads:
    /// - `NUDGE_ENABLED` (true/false)
    /// - `NUDGE_MIN_MESSAGE_GAP_SECONDS`
    /// - `NUDGE_ONLY_WHEN_IDLE` (true/false)
    /// - `NUDGE_MAX_USES`
    /// - `NUDGE_FIXED_TIMES` (comma separated `HH:MM`)
    /// - `NUDGE_RANDOM_MIN_SECONDS` / `NUDGE_RANDOM_MAX_SECONDS`
    /// - `NUDGE_INACTIVITY_SECONDS` (also enables the inactivity mode)
    /// - `NUDGE_PROVIDER`, `NUDGE_MODEL`, `NUDGE_BASE_URL`
    ///
    /// Unparseable values are ignored.
    pub fn with_env_overrides(mut self) -> Self {
        let s = &mut self.scheduler;

        if let Some(v) = env_parse::<bool>("NUDGE_ENABLED") {
            s.enabled = v;
        }
        if let Some(v) = env_parse("NUDGE_MIN_MESSAGE_GAP_SECONDS") {
            s.min_message_gap_seconds = v;
        }
        if let Some(v) = env_parse::<bool>("NUDGE_ONLY_WHEN_IDLE") {
            s.only_when_idle = v;
        }
        if let Some(v) = env_parse("NUDGE_MAX_USES") {
            s.max_uses = v;
        }
        if let Ok(times) = std::env::var("NUDGE_FIXED_TIMES") {
            let parsed: Result<Vec<TimePoint>, _> = times
                .split(',')
                .filter(|t| !t.trim().is_empty())
                .map(str::parse)
                .collect();
            if let Ok(points) = parsed {
                s.fixed_mode.times = points;
            }
        }
        if let Some(v) = env_parse("NUDGE_RANDOM_MIN_SECONDS") {
            s.random_mode.min_interval_seconds = v;
        }
        if let Some(v) = env_parse("NUDGE_RANDOM_MAX_SECONDS") {
            s.random_mode.max_interval_seconds = v;
        }
        if let Some(v) = env_parse("NUDGE_INACTIVITY_SECONDS") {
            s.inactivity_mode.enabled = true;
            s.inactivity_mode.idle_threshold_seconds = v;
        }

        if let Some(v) = env_parse("NUDGE_PROVIDER") {
            self.provider.provider = v;
        }
        if let Ok(model) = std::env::var("NUDGE_MODEL") {
            self.provider.model = model;
        }
        if let Ok(url) = std::env::var("NUDGE_BASE_URL") {
            self.provider.base_url = Some(url);
        }

        self
    }

    /// Build configuration using builder pattern.
    pub fn builder() -> NudgeConfigBuilder {
        NudgeConfigBuilder::default()
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

/// Builder for NudgeConfig.
#[derive(Default)]
pub struct NudgeConfigBuilder {
    config: NudgeConfig,
}

impl NudgeConfigBuilder {
    /// Set the fixed daily time points.
    pub fn fixed_times(mut self, times: impl IntoIterator<Item = TimePoint>) -> Self {
        self.config.scheduler.fixed_mode.times = times.into_iter().collect();
        self
    }

    /// Enable the random mode with the given bounds in seconds.
    pub fn random_interval(mut self, min_seconds: u64, max_seconds: u64) -> Self {
        let random = &mut self.config.scheduler.random_mode;
        random.enabled = true;
        random.min_interval_seconds = min_seconds;
        random.max_interval_seconds = max_seconds;
        self
    }

    /// Enable the inactivity mode with the given timeout in seconds.
    pub fn inactivity_timeout(mut self, seconds: u64) -> Self {
        let inactivity = &mut self.config.scheduler.inactivity_mode;
        inactivity.enabled = true;
        inactivity.idle_threshold_seconds = seconds;
        self
    }

    /// Turn a mode off.
    pub fn without_mode(mut self, mode: TriggerMode) -> Self {
        let s = &mut self.config.scheduler;
        match mode {
            TriggerMode::Fixed => s.fixed_mode.enabled = false,
            TriggerMode::Random => s.random_mode.enabled = false,
            TriggerMode::Inactivity => s.inactivity_mode.enabled = false,
        }
        self
    }

    /// Set the minimum gap between automated messages.
    pub fn min_message_gap(mut self, seconds: u64) -> Self {
        self.config.scheduler.min_message_gap_seconds = seconds;
        self
    }

    /// Set whether sends require the user to be idle.
    pub fn only_when_idle(mut self, only_when_idle: bool) -> Self {
        self.config.scheduler.only_when_idle = only_when_idle;
        self
    }

    /// Cap sends per activity cycle (0 = unlimited).
    pub fn max_uses(mut self, max_uses: u32) -> Self {
        self.config.scheduler.max_uses = max_uses;
        self
    }

    /// Replace the prompt list.
    pub fn prompts<I, S>(mut self, prompts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.scheduler.prompts = prompts.into_iter().map(Into::into).collect();
        self
    }

    /// Set the provider configuration.
    pub fn provider(mut self, provider: ProviderConfig) -> Self {
        self.config.provider = provider;
        self
    }

    /// Build the configuration.
    pub fn build(self) -> NudgeConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_builder() {
        let config = NudgeConfig::builder()
            .random_interval(20, 40)
            .without_mode(TriggerMode::Fixed)
            .max_uses(3)
            .prompts(["hi"])
            .build();

        let s = &config.scheduler;
        assert!(s.random_mode.enabled);
        assert_eq!(s.random_mode.min_interval_seconds, 20);
        assert!(!s.fixed_mode.enabled);
        assert_eq!(s.max_uses, 3);
        assert_eq!(s.prompts, vec!["hi".to_string()]);
    }

    #[test]
    fn test_round_trip_every_format() {
        let dir = TempDir::new().unwrap();
        let config = NudgeConfig::builder()
            .inactivity_timeout(90)
            .provider(ProviderConfig::new(GeneratorProvider::Anthropic))
            .build();

        for name in ["config.toml", "config.json", "config.yaml"] {
            let path = dir.path().join("nested").join(name);
            config.save_to_file(&path).unwrap();
            let loaded = NudgeConfig::from_file(&path).unwrap();
            assert_eq!(loaded, config, "round trip through {}", name);
        }
    }

    #[test]
    fn test_unsupported_extension() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.ini");
        std::fs::write(&path, "enabled = true").unwrap();
        let err = NudgeConfig::from_file(&path).unwrap_err();
        assert!(matches!(err, NudgeError::Configuration(_)));
    }

    #[test]
    fn test_missing_file_is_configuration_error() {
        let dir = TempDir::new().unwrap();
        let err = NudgeConfig::from_file(dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, NudgeError::Configuration(_)));
    }

    #[test]
    fn test_partial_file_merges_over_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[scheduler]\nonly_when_idle = false\n\n[provider]\nprovider = \"ollama\"\n",
        )
        .unwrap();

        let config = NudgeConfig::from_file(&path).unwrap();
        assert!(!config.scheduler.only_when_idle);
        assert_eq!(config.scheduler.min_message_gap_seconds, 5);
        assert_eq!(config.provider.provider, GeneratorProvider::Ollama);
        assert_eq!(config.provider.model_or_default(), "llama3.2");
    }

    #[test]
    fn test_default_path_ends_with_config_toml() {
        let path = NudgeConfig::default_path();
        assert!(path.ends_with("nudge/config.toml") || path.ends_with(".nudge/config.toml"));
    }
}
