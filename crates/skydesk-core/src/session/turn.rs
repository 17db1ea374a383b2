//! Per-turn backend snapshot types and the `TurnClient` seam.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::agent::AgentDescriptor;
use super::event::{EventKind, LifecycleEvent};
use super::guardrail::GuardrailCheck;
use crate::error::Result;

/// An assistant message as returned by one turn, before it is converted
/// into a timeline [`super::ConversationMessage`] at merge time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncomingMessage {
    pub content: String,
    pub agent: String,
}

/// A lifecycle event as returned by one turn.
///
/// The backend may omit the timestamp; the event log stamps it with the
/// arrival time during the merge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncomingEvent {
    pub id: String,
    pub kind: EventKind,
    pub agent: String,
    pub content: String,
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

impl IncomingEvent {
    /// Finalizes the event, substituting `arrival` for a missing timestamp.
    pub(super) fn into_event(self, arrival: DateTime<Utc>) -> LifecycleEvent {
        LifecycleEvent {
            id: self.id,
            kind: self.kind,
            agent: self.agent,
            content: self.content,
            metadata: self.metadata,
            timestamp: self.timestamp.unwrap_or(arrival),
        }
    }
}

/// The backend's authoritative snapshot for one turn.
///
/// `current_agent`, `context`, and `agents` replace the previous values
/// wholesale; `events` and `messages` are additive batches; `guardrails`
/// goes through reconciliation before display.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TurnResponse {
    pub conversation_id: String,
    pub current_agent: String,
    #[serde(default)]
    pub context: HashMap<String, serde_json::Value>,
    #[serde(default)]
    pub events: Vec<IncomingEvent>,
    #[serde(default)]
    pub agents: Vec<AgentDescriptor>,
    #[serde(default)]
    pub guardrails: Vec<GuardrailCheck>,
    #[serde(default)]
    pub messages: Vec<IncomingMessage>,
}

/// One blocking round trip to the conversation backend.
///
/// An empty `utterance` means "initialize the session, produce whatever
/// greeting/state exists with no user input"; an empty `conversation_id`
/// means "create new". Implementations perform no retries: a submission
/// either completes or fails terminally, and a failure means no state was
/// applied for that turn.
#[async_trait]
pub trait TurnClient: Send + Sync {
    /// Sends one user utterance and returns the turn's snapshot.
    ///
    /// # Errors
    ///
    /// Returns a transport error on any network or decoding failure; the
    /// caller must treat the call as not-happened.
    async fn submit(&self, utterance: &str, conversation_id: &str) -> Result<TurnResponse>;
}
