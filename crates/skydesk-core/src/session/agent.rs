//! Backend agent roster types.

use serde::{Deserialize, Serialize};

/// Metadata the backend publishes for one agent in its roster.
///
/// The roster is an authoritative snapshot: the backend owns the agent
/// topology, so the whole list is replaced on every turn rather than merged.
/// Every field except `name` is optional on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AgentDescriptor {
    /// Unique agent name, also used to identify the current agent.
    pub name: String,
    /// Human-readable description of what the agent handles.
    #[serde(default)]
    pub description: String,
    /// Names of agents this agent can hand off to.
    #[serde(default)]
    pub handoffs: Vec<String>,
    /// Names of tools available to this agent.
    #[serde(default)]
    pub tools: Vec<String>,
    /// Ordered guardrail names declared to run on this agent's input.
    ///
    /// This list drives guardrail reconciliation: it is authoritative for
    /// what to display and in which order.
    #[serde(default)]
    pub input_guardrails: Vec<String>,
}
