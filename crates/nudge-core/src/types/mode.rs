//! Trigger mode tags.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

/// Which strategy produced a trigger.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum TriggerMode {
    /// Fixed daily time points.
    Fixed,
    /// Uniformly random interval.
    Random,
    /// Silence since the last user input.
    Inactivity,
}
