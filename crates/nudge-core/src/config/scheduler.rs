//! Scheduler settings: trigger modes, gating rules and generation parameters.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{NudgeError, NudgeResult};
use crate::types::TriggerMode;

/// A daily time point, `hour:minute` in the scheduler's timezone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TimePoint {
    pub hour: u32,
    pub minute: u32,
}

impl TimePoint {
    pub const fn new(hour: u32, minute: u32) -> Self {
        Self { hour, minute }
    }

    /// Minutes since midnight.
    pub fn minute_of_day(&self) -> u32 {
        self.hour * 60 + self.minute
    }

    pub fn is_valid(&self) -> bool {
        self.hour < 24 && self.minute < 60
    }
}

impl std::fmt::Display for TimePoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

impl std::str::FromStr for TimePoint {
    type Err = NudgeError;

    /// Parse `HH:MM`.
    fn from_str(s: &str) -> NudgeResult<Self> {
        let (h, m) = s.trim().split_once(':').ok_or_else(|| {
            NudgeError::validation_with_suggestion(
                format!("Invalid time point '{}'", s),
                "Use HH:MM, e.g. 08:30",
            )
        })?;
        let point = TimePoint {
            hour: h
                .parse()
                .map_err(|_| NudgeError::validation(format!("Invalid hour in '{}'", s)))?,
            minute: m
                .parse()
                .map_err(|_| NudgeError::validation(format!("Invalid minute in '{}'", s)))?,
        };
        if !point.is_valid() {
            return Err(NudgeError::validation(format!("Time point '{}' out of range", s)));
        }
        Ok(point)
    }
}

/// Fixed daily time points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FixedModeConfig {
    pub enabled: bool,
    /// Daily points; order does not matter.
    pub times: Vec<TimePoint>,
    /// How long the user must be idle before a fixed-time send (default: 30 minutes).
    pub idle_threshold_seconds: u64,
    /// Timezone offset for the time points; `None` uses the host's local time.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub utc_offset_minutes: Option<i32>,
}

impl Default for FixedModeConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            times: vec![TimePoint::new(8, 30), TimePoint::new(18, 0)],
            idle_threshold_seconds: 1800,
            utc_offset_minutes: None,
        }
    }
}

/// Uniformly random interval between sends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RandomModeConfig {
    pub enabled: bool,
    pub min_interval_seconds: u64,
    pub max_interval_seconds: u64,
    /// Idle requirement; `None` uses `max_interval_seconds`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub idle_threshold_seconds: Option<u64>,
}

impl Default for RandomModeConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            min_interval_seconds: 10,
            max_interval_seconds: 60,
            idle_threshold_seconds: None,
        }
    }
}

/// Fire after a period of user silence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InactivityModeConfig {
    pub enabled: bool,
    /// Silence before firing (default: 10 minutes).
    pub idle_threshold_seconds: u64,
}

impl Default for InactivityModeConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            idle_threshold_seconds: 600,
        }
    }
}

/// Parameters forwarded with every generation request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    /// Trailing messages sent as context; 0 sends the whole conversation.
    pub context_messages: usize,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            max_tokens: Some(150),
            temperature: None,
            context_messages: 0,
        }
    }
}

/// Upper bound for every `*_seconds` setting: one year.
pub const MAX_DURATION_SECONDS: u64 = 366 * 24 * 60 * 60;

/// Scheduler configuration snapshot. Replaced wholesale on update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Master switch.
    pub enabled: bool,
    /// Minimum gap between two automated messages.
    pub min_message_gap_seconds: u64,
    /// Only send after the user has been idle for the mode's threshold.
    pub only_when_idle: bool,
    /// Sends allowed per activity cycle; 0 is unlimited.
    pub max_uses: u32,
    /// Instructions; one is picked at random per send.
    pub prompts: Vec<String>,
    pub fixed_mode: FixedModeConfig,
    pub random_mode: RandomModeConfig,
    pub inactivity_mode: InactivityModeConfig,
    pub generation: GenerationSettings,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            min_message_gap_seconds: 5,
            only_when_idle: true,
            max_uses: 0,
            prompts: default_prompts(),
            fixed_mode: FixedModeConfig::default(),
            random_mode: RandomModeConfig::default(),
            inactivity_mode: InactivityModeConfig::default(),
            generation: GenerationSettings::default(),
        }
    }
}

fn default_prompts() -> Vec<String> {
    vec![
        "Based on the conversation so far, naturally continue the exchange.".to_string(),
        "Is there anything you would like to talk about? I'm happy to keep going.".to_string(),
        "Picking up where we left off, what do you think?".to_string(),
    ]
}

impl SchedulerConfig {
    /// Minimum gap between automated messages.
    pub fn min_message_gap(&self) -> Duration {
        Duration::from_secs(self.min_message_gap_seconds)
    }

    /// Idle requirement for a trigger from `mode`.
    pub fn idle_threshold(&self, mode: TriggerMode) -> Duration {
        let secs = match mode {
            TriggerMode::Fixed => self.fixed_mode.idle_threshold_seconds,
            TriggerMode::Random => self
                .random_mode
                .idle_threshold_seconds
                .unwrap_or(self.random_mode.max_interval_seconds),
            TriggerMode::Inactivity => self.inactivity_mode.idle_threshold_seconds,
        };
        Duration::from_secs(secs)
    }

    /// Whether `mode` is switched on (ignores the master switch).
    pub fn mode_enabled(&self, mode: TriggerMode) -> bool {
        match mode {
            TriggerMode::Fixed => self.fixed_mode.enabled,
            TriggerMode::Random => self.random_mode.enabled,
            TriggerMode::Inactivity => self.inactivity_mode.enabled,
        }
    }

    /// Whether `mode` should be armed right now.
    pub fn is_active(&self, mode: TriggerMode) -> bool {
        self.enabled && self.mode_enabled(mode)
    }

    /// List every problem with this configuration as `(field, problem)`.
    pub fn problems(&self) -> Vec<(String, String)> {
        let mut problems = Vec::new();

        if self.prompts.iter().all(|p| p.trim().is_empty()) {
            problems.push((
                "prompts".to_string(),
                "at least one non-empty prompt is required".to_string(),
            ));
        }
        for (i, point) in self.fixed_mode.times.iter().enumerate() {
            if !point.is_valid() {
                problems.push((
                    format!("fixed_mode.times[{}]", i),
                    format!("{}:{} is not a valid time of day", point.hour, point.minute),
                ));
            }
        }
        if let Some(offset) = self.fixed_mode.utc_offset_minutes {
            if offset.abs() >= 24 * 60 {
                problems.push((
                    "fixed_mode.utc_offset_minutes".to_string(),
                    "must be within +/- 1439".to_string(),
                ));
            }
        }
        if self.random_mode.min_interval_seconds > self.random_mode.max_interval_seconds {
            problems.push((
                "random_mode.min_interval_seconds".to_string(),
                "must not exceed max_interval_seconds".to_string(),
            ));
        }
        if self.inactivity_mode.enabled && self.inactivity_mode.idle_threshold_seconds == 0 {
            problems.push((
                "inactivity_mode.idle_threshold_seconds".to_string(),
                "must be at least 1 second".to_string(),
            ));
        }
        for (field, seconds) in self.durations() {
            if seconds > MAX_DURATION_SECONDS {
                problems.push((
                    field.to_string(),
                    format!("must not exceed {} seconds", MAX_DURATION_SECONDS),
                ));
            }
        }

        problems
    }

    /// Every duration setting with its field name.
    fn durations(&self) -> Vec<(&'static str, u64)> {
        let mut durations = vec![
            ("min_message_gap_seconds", self.min_message_gap_seconds),
            (
                "fixed_mode.idle_threshold_seconds",
                self.fixed_mode.idle_threshold_seconds,
            ),
            (
                "random_mode.min_interval_seconds",
                self.random_mode.min_interval_seconds,
            ),
            (
                "random_mode.max_interval_seconds",
                self.random_mode.max_interval_seconds,
            ),
            (
                "inactivity_mode.idle_threshold_seconds",
                self.inactivity_mode.idle_threshold_seconds,
            ),
        ];
        if let Some(seconds) = self.random_mode.idle_threshold_seconds {
            durations.push(("random_mode.idle_threshold_seconds", seconds));
        }
        durations
    }

    /// Reject the configuration if [`problems`](Self::problems) finds anything.
    pub fn validate(&self) -> NudgeResult<()> {
        let problems = self.problems();
        if problems.is_empty() {
            Ok(())
        } else {
            Err(NudgeError::invalid_fields(problems))
        }
    }

    /// Repair what can be repaired: drops invalid and duplicate time points,
    /// caps durations at [`MAX_DURATION_SECONDS`], orders the random bounds
    /// and drops blank prompts. Falls back to the default prompts when none
    /// remain.
    pub fn normalized(mut self) -> Self {
        self.fixed_mode.times.retain(TimePoint::is_valid);
        self.fixed_mode.times.sort();
        self.fixed_mode.times.dedup();

        if let Some(offset) = self.fixed_mode.utc_offset_minutes {
            if offset.abs() >= 24 * 60 {
                self.fixed_mode.utc_offset_minutes = None;
            }
        }

        let cap = |seconds: &mut u64| *seconds = (*seconds).min(MAX_DURATION_SECONDS);
        cap(&mut self.min_message_gap_seconds);
        cap(&mut self.fixed_mode.idle_threshold_seconds);
        cap(&mut self.inactivity_mode.idle_threshold_seconds);

        let random = &mut self.random_mode;
        cap(&mut random.min_interval_seconds);
        cap(&mut random.max_interval_seconds);
        if let Some(seconds) = random.idle_threshold_seconds.as_mut() {
            cap(seconds);
        }
        if random.min_interval_seconds > random.max_interval_seconds {
            std::mem::swap(
                &mut random.min_interval_seconds,
                &mut random.max_interval_seconds,
            );
        }

        let inactivity = &mut self.inactivity_mode;
        inactivity.idle_threshold_seconds = inactivity.idle_threshold_seconds.max(1);

        self.prompts.retain(|p| !p.trim().is_empty());
        if self.prompts.is_empty() {
            self.prompts = default_prompts();
        }
        self
    }
}
