//! Turning a generation request into chat turns.

use chrono::Utc;
use nudge_core::traits::GenerationRequest;
use nudge_core::types::{Message, MessageRole};

/// Context first, then the instruction as a trailing system message.
pub(crate) fn with_trailing_instruction(request: &GenerationRequest) -> Vec<Message> {
    let mut messages = request.context.clone();
    let at = messages.last().map(|m| m.timestamp).unwrap_or_else(Utc::now);
    messages.push(Message::system(request.prompt.clone(), at));
    messages
}

/// Split for APIs that take the system prompt separately and want
/// user/assistant turns that start and end with the user.
///
/// The instruction and any system context become the system prompt. If the
/// conversation would end on an assistant turn, the instruction is repeated
/// as a closing user turn so the model writes a new message instead of
/// continuing the old one.
pub(crate) fn split_system(request: &GenerationRequest) -> (String, Vec<(MessageRole, String)>) {
    let mut system: Vec<&str> = request
        .context
        .iter()
        .filter(|m| m.role == MessageRole::System)
        .map(|m| m.content.as_str())
        .collect();
    system.push(request.prompt.as_str());

    let mut turns: Vec<(MessageRole, String)> = request
        .context
        .iter()
        .filter(|m| m.role != MessageRole::System)
        .skip_while(|m| m.role == MessageRole::Assistant)
        .map(|m| (m.role, m.content.clone()))
        .collect();

    if turns.last().map_or(true, |(role, _)| *role != MessageRole::User) {
        turns.push((MessageRole::User, request.prompt.clone()));
    }

    (system.join("\n\n"), turns)
}
