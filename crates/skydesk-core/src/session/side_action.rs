//! Sentinel-content detection and seat-selection state.
//!
//! The backend requests the seat-selection sub-flow out-of-band by sending
//! an assistant message whose content is exactly the reserved sentinel
//! literal. The sentinel is a control signal, not chat content: it stays in
//! the canonical timeline for state purposes but is filtered from the
//! rendered transcript.

use serde::{Deserialize, Serialize};

use super::message::{ConversationMessage, MessageRole};

/// Reserved literal the backend sends to request the seat chooser.
///
/// Content equality must be exact, never substring.
pub const SEAT_MAP_SENTINEL: &str = "DISPLAY_SEAT_MAP";

/// The orthogonal seat-selection sub-state of a session.
///
/// Invariant: once `Resolved`, the trigger never re-arms for this session,
/// even though the sentinel message remains in the timeline for audit
/// purposes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum SideActionState {
    /// No seat selection has been requested.
    None,
    /// The backend requested a seat selection and the user has not chosen yet.
    Prompting,
    /// The user chose a seat; permanent for the session's lifetime.
    Resolved {
        /// The chosen seat (e.g. "23A").
        seat: String,
    },
}

impl SideActionState {
    /// `true` while the session is waiting for a seat choice.
    pub fn is_prompting(&self) -> bool {
        matches!(self, Self::Prompting)
    }

    /// `true` once a seat has been chosen.
    pub fn is_resolved(&self) -> bool {
        matches!(self, Self::Resolved { .. })
    }
}

/// Scans the whole message list for the seat-map sentinel.
///
/// True iff at least one message has role assistant and content exactly
/// equal to the sentinel literal. Purely a predicate: it is re-evaluated
/// over the full list rather than incrementally tracked, so it is idempotent
/// and side-effect-free. The session alone owns whether a trigger is allowed
/// to fire.
pub fn has_seat_map_trigger(messages: &[ConversationMessage]) -> bool {
    messages
        .iter()
        .any(|m| m.role == MessageRole::Assistant && m.content == SEAT_MAP_SENTINEL)
}
