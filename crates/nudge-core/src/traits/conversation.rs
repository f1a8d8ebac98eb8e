//! Conversation store trait.

use async_trait::async_trait;

use crate::error::NudgeResult;
use crate::types::{Conversation, Message};

/// Access to the host's active conversation.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// The conversation currently in focus, if any.
    async fn current_conversation(&self) -> NudgeResult<Option<Conversation>>;

    /// Append a message to the conversation with the given id.
    async fn append_message(&self, conversation_id: &str, message: Message) -> NudgeResult<()>;
}
