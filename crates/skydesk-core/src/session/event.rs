//! Lifecycle events and the append-only event log.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::turn::IncomingEvent;

/// The kind of lifecycle event the backend reported.
///
/// Unknown kinds degrade to `Other` instead of failing the decode, so a
/// newer backend can introduce event types without breaking older clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Message,
    Handoff,
    ToolCall,
    ToolOutput,
    ContextUpdate,
    #[serde(other)]
    Other,
}

/// A single lifecycle event (agent handoff, tool invocation, etc.).
///
/// Events are append-only: never replaced, reordered, or deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LifecycleEvent {
    /// Backend-assigned event identifier.
    pub id: String,
    /// What happened.
    pub kind: EventKind,
    /// The agent the event is attributed to.
    pub agent: String,
    /// Free-form event description (e.g. "Triage Agent -> Seat Booking Agent").
    pub content: String,
    /// Open backend-supplied metadata (tool arguments, context diffs, ...).
    pub metadata: Option<serde_json::Value>,
    /// Backend timestamp, or the arrival time if the backend omitted one.
    pub timestamp: DateTime<Utc>,
}

/// An append-only ordered sequence of lifecycle events.
///
/// Invariant: sequence order == arrival order, always. There is no
/// deduplication, reordering, or deletion.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Vec<LifecycleEvent>,
}

impl EventLog {
    /// Creates an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a batch of incoming events in arrival order.
    ///
    /// Each event missing a backend timestamp is stamped with the arrival
    /// time instead.
    pub fn append(&mut self, batch: Vec<IncomingEvent>) {
        let arrival = Utc::now();
        for incoming in batch {
            self.events.push(incoming.into_event(arrival));
        }
    }

    /// Returns the events in arrival order.
    pub fn as_slice(&self) -> &[LifecycleEvent] {
        &self.events
    }

    /// Returns the number of recorded events.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Returns `true` if no events have been recorded.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
