//! Scheduler events.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::gate::RejectReason;
use crate::types::{Message, TriggerMode};

/// Something the scheduler did.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SchedulerEvent {
    /// Strategies were armed.
    Started { modes: Vec<TriggerMode> },
    /// Every strategy was cancelled.
    Stopped,
    /// A strategy will fire at `fires_at`.
    Armed {
        mode: TriggerMode,
        fires_at: DateTime<Utc>,
    },
    /// A strategy's timer elapsed and the trigger went to the gate.
    Fired { mode: TriggerMode },
    /// An automated message was appended.
    Sent {
        mode: TriggerMode,
        conversation_id: String,
        message: Message,
    },
    /// The gate refused the trigger.
    Rejected {
        mode: TriggerMode,
        reason: RejectReason,
    },
    /// Generation or append failed.
    Failed { mode: TriggerMode, error: String },
    /// A new configuration snapshot was installed.
    ConfigUpdated,
}

impl SchedulerEvent {
    /// Get the event type as a string for filtering
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Started { .. } => "scheduler.started",
            Self::Stopped => "scheduler.stopped",
            Self::Armed { .. } => "trigger.armed",
            Self::Fired { .. } => "trigger.fired",
            Self::Sent { .. } => "message.sent",
            Self::Rejected { .. } => "trigger.rejected",
            Self::Failed { .. } => "message.failed",
            Self::ConfigUpdated => "config.updated",
        }
    }

    /// The trigger mode this event concerns, if any.
    pub fn mode(&self) -> Option<TriggerMode> {
        match self {
            Self::Armed { mode, .. }
            | Self::Fired { mode }
            | Self::Sent { mode, .. }
            | Self::Rejected { mode, .. }
            | Self::Failed { mode, .. } => Some(*mode),
            Self::Started { .. } | Self::Stopped | Self::ConfigUpdated => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serializes_with_type_tag() {
        let event = SchedulerEvent::Rejected {
            mode: TriggerMode::Random,
            reason: RejectReason::UseCapReached { max_uses: 2 },
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "rejected");
        assert_eq!(json["mode"], "random");
        assert_eq!(json["reason"]["reason"], "use_cap_reached");
    }
}
