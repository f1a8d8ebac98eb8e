//! Send gate.
//!
//! Every trigger, whatever strategy produced it, goes through
//! [`Dispatcher::try_send`]. Checks run in a fixed order and the first
//! failing one decides the outcome. Timer triggers are first dropped when
//! stale or when their mode was switched off; then, for every trigger:
//!
//! 0. at least one usable prompt
//! 1. cooldown since the last automated message
//! 2. user idle for the mode's threshold (when `only_when_idle`)
//! 3. use cap (when `max_uses > 0`)
//! 4. a current, non-empty conversation
//!
//! On success a random prompt is sent to the generation service and the
//! trimmed reply is appended as an assistant message.

use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::context::SchedulerContext;
use crate::events::SchedulerEvent;
use crate::traits::{GenerationParameters, GenerationRequest};
use crate::types::{Message, TriggerMode};

/// Why the gate refused a trigger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum RejectReason {
    /// The scheduler or this mode is switched off.
    Disabled,
    /// Armed before the last stop; a newer timer owns this mode.
    Stale,
    /// No usable prompt configured.
    NoPrompts,
    /// Too soon after the previous automated message.
    Cooldown { remaining_ms: u64 },
    /// The user was active too recently.
    NotIdle { idle_ms: u64, required_ms: u64 },
    /// `max_uses` sends already happened in this activity cycle.
    UseCapReached { max_uses: u32 },
    /// The host has no conversation in focus.
    NoConversation,
    /// The conversation has no messages yet.
    EmptyConversation,
    /// The generation service returned only whitespace.
    EmptyReply,
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Disabled => write!(f, "disabled"),
            Self::Stale => write!(f, "stale trigger"),
            Self::NoPrompts => write!(f, "no prompts configured"),
            Self::Cooldown { remaining_ms } => {
                write!(f, "cooldown, {}ms remaining", remaining_ms)
            }
            Self::NotIdle {
                idle_ms,
                required_ms,
            } => write!(f, "user idle {}ms of required {}ms", idle_ms, required_ms),
            Self::UseCapReached { max_uses } => write!(f, "use cap of {} reached", max_uses),
            Self::NoConversation => write!(f, "no active conversation"),
            Self::EmptyConversation => write!(f, "conversation is empty"),
            Self::EmptyReply => write!(f, "empty reply"),
        }
    }
}

/// Result of one pass through the gate.
#[derive(Debug, Clone, PartialEq)]
pub enum SendOutcome {
    /// A message was appended to `conversation_id`.
    Sent {
        conversation_id: String,
        message: Message,
    },
    Rejected(RejectReason),
    /// A collaborator failed; state is unchanged.
    Failed(String),
}

impl SendOutcome {
    pub fn is_sent(&self) -> bool {
        matches!(self, Self::Sent { .. })
    }

    pub fn is_rejected(&self) -> bool {
        matches!(self, Self::Rejected(_))
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }

    /// The rejection reason, if rejected.
    pub fn reject_reason(&self) -> Option<&RejectReason> {
        match self {
            Self::Rejected(reason) => Some(reason),
            _ => None,
        }
    }
}

/// Where a trigger came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Origin {
    /// A strategy timer armed in `epoch`.
    Armed { epoch: u64 },
    /// A direct request from the host.
    Manual,
}

/// Validates triggers and performs sends.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    ctx: Arc<SchedulerContext>,
}

impl Dispatcher {
    pub fn new(ctx: Arc<SchedulerContext>) -> Self {
        Self { ctx }
    }

    /// Run the gate for a trigger from `mode`.
    pub async fn try_send(&self, mode: TriggerMode) -> SendOutcome {
        self.dispatch(mode, Origin::Manual).await
    }

    pub(crate) async fn dispatch(&self, mode: TriggerMode, origin: Origin) -> SendOutcome {
        let outcome = self.run_gate(mode, origin).await;
        match &outcome {
            SendOutcome::Sent {
                conversation_id,
                message,
            } => {
                info!(mode = %mode, conversation_id = %conversation_id, "Automated message sent");
                self.ctx.emit(SchedulerEvent::Sent {
                    mode,
                    conversation_id: conversation_id.clone(),
                    message: message.clone(),
                });
            }
            SendOutcome::Rejected(reason) => {
                debug!(mode = %mode, reason = %reason, "Trigger rejected");
                self.ctx.emit(SchedulerEvent::Rejected {
                    mode,
                    reason: reason.clone(),
                });
            }
            SendOutcome::Failed(error) => {
                warn!(mode = %mode, error = %error, "Automated message failed");
                self.ctx.emit(SchedulerEvent::Failed {
                    mode,
                    error: error.clone(),
                });
            }
        }
        outcome
    }

    async fn run_gate(&self, mode: TriggerMode, origin: Origin) -> SendOutcome {
        let _serialized = self.ctx.send_lock.lock().await;

        let config = self.ctx.config();
        let now = self.ctx.now();

        let checked = self.ctx.with_state(|state| {
            if let Origin::Armed { epoch } = origin {
                if epoch != state.epoch {
                    return Err(RejectReason::Stale);
                }
                if !config.is_active(mode) {
                    return Err(RejectReason::Disabled);
                }
            }

            let prompts: Vec<&String> =
                config.prompts.iter().filter(|p| !p.trim().is_empty()).collect();
            if prompts.is_empty() {
                return Err(RejectReason::NoPrompts);
            }

            if let Some(elapsed) = state.since_last_auto_message(now) {
                let gap = config.min_message_gap();
                if elapsed < gap {
                    return Err(RejectReason::Cooldown {
                        remaining_ms: millis(gap - elapsed),
                    });
                }
            }

            if config.only_when_idle {
                let idle = state.idle_for(now);
                let required = config.idle_threshold(mode);
                if idle < required {
                    return Err(RejectReason::NotIdle {
                        idle_ms: millis(idle),
                        required_ms: millis(required),
                    });
                }
            }

            if config.max_uses > 0 && state.use_count >= config.max_uses {
                return Err(RejectReason::UseCapReached {
                    max_uses: config.max_uses,
                });
            }

            let mut rng = rand::thread_rng();
            Ok(prompts.choose(&mut rng).map(|p| p.to_string()).unwrap_or_default())
        });

        let prompt = match checked {
            Ok(prompt) => prompt,
            Err(reason) => return SendOutcome::Rejected(reason),
        };

        let conversation = match self.ctx.host().conversations.current_conversation().await {
            Ok(Some(conversation)) => conversation,
            Ok(None) => return SendOutcome::Rejected(RejectReason::NoConversation),
            Err(e) => return SendOutcome::Failed(e.to_string()),
        };
        if conversation.is_empty() {
            return SendOutcome::Rejected(RejectReason::EmptyConversation);
        }

        let mut extra = conversation.parameters.clone();
        extra.retain(|k, _| k != "max_tokens" && k != "temperature");
        let request = GenerationRequest {
            prompt,
            context: conversation.recent(config.generation.context_messages).to_vec(),
            model: conversation.model.clone(),
            parameters: GenerationParameters {
                max_tokens: config.generation.max_tokens,
                temperature: config.generation.temperature,
                extra,
            },
        };

        debug!(
            mode = %mode,
            conversation_id = %conversation.id,
            context_len = request.context.len(),
            "Requesting generation"
        );

        let text = match self.ctx.host().generator.generate(request).await {
            Ok(response) => response.text.trim().to_string(),
            Err(e) => return SendOutcome::Failed(e.to_string()),
        };
        if text.is_empty() {
            return SendOutcome::Rejected(RejectReason::EmptyReply);
        }

        let message = Message::assistant(text, self.ctx.now());
        if let Err(e) = self
            .ctx
            .host()
            .conversations
            .append_message(&conversation.id, message.clone())
            .await
        {
            return SendOutcome::Failed(e.to_string());
        }

        let sent_at = self.ctx.now();
        self.ctx.with_state(|state| state.record_send(sent_at));

        SendOutcome::Sent {
            conversation_id: conversation.id,
            message,
        }
    }
}

fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}
