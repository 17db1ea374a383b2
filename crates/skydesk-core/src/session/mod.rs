//! Session domain module.
//!
//! This module contains the conversation session state machine and the
//! supporting domain models it merges backend turns into.
//!
//! # Module Structure
//!
//! - `message`: Conversation message types (`MessageRole`, `ConversationMessage`)
//! - `agent`: Backend agent roster entries (`AgentDescriptor`)
//! - `event`: Lifecycle events and the append-only `EventLog`
//! - `guardrail`: Guardrail check results and name reconciliation
//! - `side_action`: Sentinel-content detection and seat-selection state
//! - `turn`: Per-turn backend snapshot types and the `TurnClient` seam
//! - `manager`: The `ConversationSession` orchestrator
//! - `snapshot`: Read-only view handed to the rendering layer

mod agent;
mod event;
mod guardrail;
mod manager;
mod message;
mod side_action;
mod snapshot;
mod turn;

// Re-export public API
pub use agent::AgentDescriptor;
pub use event::{EventKind, EventLog, LifecycleEvent};
pub use guardrail::{GuardrailCheck, canonical_guardrail_name, display_guardrail_name, reconcile};
pub use manager::ConversationSession;
pub use message::{ConversationMessage, MessageRole};
pub use side_action::{SEAT_MAP_SENTINEL, SideActionState, has_seat_map_trigger};
pub use snapshot::SessionSnapshot;
pub use turn::{IncomingEvent, IncomingMessage, TurnClient, TurnResponse};
