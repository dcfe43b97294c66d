//! Conversation transcript
//!
//! Append-only record of every utterance in a session, tagged with the
//! agent that produced each reply.

use crate::models::AgentId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Role of a message sender
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

/// A single message in the transcript
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationMessage {
    pub message_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub role: MessageRole,
    pub content: String,
    /// Agent that produced an assistant message; `None` for user messages
    pub agent: Option<AgentId>,
}

impl ConversationMessage {
    pub fn new(role: MessageRole, content: impl Into<String>, agent: Option<AgentId>) -> Self {
        Self {
            message_id: Uuid::new_v4(),
            timestamp: Utc::now(),
            role,
            content: content.into(),
            agent,
        }
    }
}

/// Ordered, append-only message log for one conversation
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Transcript {
    messages: Vec<ConversationMessage>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message. There is no way to remove one.
    pub fn push(&mut self, message: ConversationMessage) -> &ConversationMessage {
        self.messages.push(message);
        &self.messages[self.messages.len() - 1]
    }

    pub fn messages(&self) -> impl Iterator<Item = &ConversationMessage> {
        self.messages.iter()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversation_message_creation() {
        let msg = ConversationMessage::new(MessageRole::User, "hello", None);
        assert_eq!(msg.role, MessageRole::User);
        assert!(msg.agent.is_none());
        assert_eq!(msg.content, "hello");
    }

    #[test]
    fn test_transcript_keeps_order() {
        let mut transcript = Transcript::new();
        transcript.push(ConversationMessage::new(MessageRole::User, "1", None));
        transcript.push(ConversationMessage::new(
            MessageRole::Assistant,
            "credit desk",
            Some(AgentId::Credit),
        ));
        transcript.push(ConversationMessage::new(MessageRole::User, "8000", None));

        let contents: Vec<_> = transcript.messages().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["1", "credit desk", "8000"]);
        assert_eq!(transcript.len(), 3);
        assert!(transcript
            .messages()
            .any(|m| m.role == MessageRole::Assistant && m.agent == Some(AgentId::Credit)));
    }
}
