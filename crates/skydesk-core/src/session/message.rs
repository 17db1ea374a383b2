//! Conversation message types.
//!
//! This module contains types for representing messages in a conversation,
//! including roles and message content.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Represents the role of a message in a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageRole {
    /// Message from the user.
    User,
    /// Message from an assistant agent.
    Assistant,
}

/// A single message in the conversation timeline.
///
/// Messages are created client-side: immediately for user input, and at
/// merge time for each assistant message a turn returns. A message is never
/// mutated after creation; the timeline only ever appends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationMessage {
    /// Locally generated unique identifier (UUID format).
    ///
    /// Ids must stay unique even when several messages are created within
    /// the same millisecond, so they are not derived from timestamps.
    pub id: String,
    /// The role of the message sender.
    pub role: MessageRole,
    /// The content of the message.
    pub content: String,
    /// Name of the agent that authored the message (assistant only).
    pub agent: Option<String>,
    /// Timestamp when the message was created locally.
    pub timestamp: DateTime<Utc>,
}

impl ConversationMessage {
    /// Creates a user message stamped with the current time.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role: MessageRole::User,
            content: content.into(),
            agent: None,
            timestamp: Utc::now(),
        }
    }

    /// Creates an assistant message authored by the given agent.
    pub fn assistant(content: impl Into<String>, agent: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role: MessageRole::Assistant,
            content: content.into(),
            agent: Some(agent.into()),
            timestamp: Utc::now(),
        }
    }
}
