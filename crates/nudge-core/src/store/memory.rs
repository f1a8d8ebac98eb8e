//! In-memory conversation store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use crate::error::{NudgeError, NudgeResult};
use crate::traits::ConversationStore;
use crate::types::{Conversation, Message};

#[derive(Debug, Default)]
struct Inner {
    conversations: HashMap<String, Conversation>,
    current: Option<String>,
}

/// Conversations held in process memory, one of them in focus.
#[derive(Debug, Default)]
pub struct InMemoryConversationStore {
    inner: Mutex<Inner>,
}

impl InMemoryConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add `conversation` and focus it. Returns its id.
    pub fn open(&self, conversation: Conversation) -> String {
        let id = conversation.id.clone();
        let mut inner = self.lock();
        inner.conversations.insert(id.clone(), conversation);
        inner.current = Some(id.clone());
        id
    }

    /// Focus an existing conversation.
    pub fn focus(&self, conversation_id: &str) -> NudgeResult<()> {
        let mut inner = self.lock();
        if !inner.conversations.contains_key(conversation_id) {
            return Err(NudgeError::conversation_not_found(conversation_id));
        }
        inner.current = Some(conversation_id.to_string());
        Ok(())
    }

    /// Drop focus; the host shows no conversation.
    pub fn clear_focus(&self) {
        self.lock().current = None;
    }

    /// Append a user message to the focused conversation.
    pub fn push_user_message(
        &self,
        content: impl Into<String>,
        at: DateTime<Utc>,
    ) -> NudgeResult<()> {
        let mut inner = self.lock();
        let id = inner
            .current
            .clone()
            .ok_or_else(|| NudgeError::conversation("No conversation in focus"))?;
        let conversation = inner
            .conversations
            .get_mut(&id)
            .ok_or_else(|| NudgeError::conversation_not_found(&id))?;
        conversation.messages.push(Message::user(content, at));
        Ok(())
    }

    /// Copy of a stored conversation.
    pub fn get(&self, conversation_id: &str) -> Option<Conversation> {
        self.lock().conversations.get(conversation_id).cloned()
    }

    pub fn current_id(&self) -> Option<String> {
        self.lock().current.clone()
    }
}

#[async_trait]
impl ConversationStore for InMemoryConversationStore {
    async fn current_conversation(&self) -> NudgeResult<Option<Conversation>> {
        let inner = self.lock();
        Ok(inner
            .current
            .as_ref()
            .and_then(|id| inner.conversations.get(id))
            .cloned())
    }

    async fn append_message(&self, conversation_id: &str, message: Message) -> NudgeResult<()> {
        let mut inner = self.lock();
        let conversation = inner
            .conversations
            .get_mut(conversation_id)
            .ok_or_else(|| NudgeError::conversation_not_found(conversation_id))?;
        conversation.messages.push(message);
        Ok(())
    }
}
