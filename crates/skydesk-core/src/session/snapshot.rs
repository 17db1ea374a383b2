//! Read-only session view for the rendering layer.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::agent::AgentDescriptor;
use super::event::LifecycleEvent;
use super::guardrail::GuardrailCheck;
use super::message::ConversationMessage;
use super::side_action::SideActionState;

/// An immutable snapshot of everything a rendering collaborator may show.
///
/// The timeline here already excludes sentinel control messages; only the
/// session's canonical timeline keeps them, because the side-action re-scan
/// depends on their presence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSnapshot {
    /// The renderable transcript, in arrival order.
    pub messages: Vec<ConversationMessage>,
    /// `true` while a turn is in flight; the UI must not submit again.
    pub busy: bool,
    /// Name of the agent currently handling the conversation.
    pub current_agent: String,
    /// The backend's authoritative context map for the latest turn.
    pub context: HashMap<String, serde_json::Value>,
    /// All lifecycle events recorded so far, in arrival order.
    pub events: Vec<LifecycleEvent>,
    /// The backend's agent roster as of the latest turn.
    pub agents: Vec<AgentDescriptor>,
    /// Reconciled guardrail checks, in declared order.
    pub guardrails: Vec<GuardrailCheck>,
    /// Seat-selection sub-state.
    pub side_action: SideActionState,
}
