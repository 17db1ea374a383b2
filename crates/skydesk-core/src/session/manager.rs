//! Conversation session lifecycle management.

use std::collections::HashMap;

use crate::error::{Result, SkydeskError};

use super::agent::AgentDescriptor;
use super::event::EventLog;
use super::guardrail::{GuardrailCheck, reconcile};
use super::message::{ConversationMessage, MessageRole};
use super::side_action::{SEAT_MAP_SENTINEL, SideActionState, has_seat_map_trigger};
use super::snapshot::SessionSnapshot;
use super::turn::{TurnClient, TurnResponse};

/// Owns one conversation with the backend and keeps the local view
/// consistent with the backend's per-turn snapshots.
///
/// `ConversationSession` is responsible for:
/// - Issuing the implicit first probe that seeds the conversation identifier
/// - Appending user input optimistically and enforcing one turn in flight
/// - Merging each turn's authoritative snapshot into local state
/// - Reconciling guardrail results against the declared set
/// - Detecting the seat-map sentinel and driving the side-action sub-state
///
/// All state crossing the rendering boundary is copied out via
/// [`ConversationSession::snapshot`]; nothing holds a reference into the
/// session's mutable collections.
pub struct ConversationSession<T: TurnClient> {
    client: T,
    /// Backend-assigned identifier; `None` until the first turn completes.
    conversation_id: Option<String>,
    current_agent: String,
    context: HashMap<String, serde_json::Value>,
    /// Canonical timeline, sentinel messages included.
    timeline: Vec<ConversationMessage>,
    events: EventLog,
    agents: Vec<AgentDescriptor>,
    guardrails: Vec<GuardrailCheck>,
    side_action: SideActionState,
    busy: bool,
    started: bool,
}

impl<T: TurnClient> ConversationSession<T> {
    /// Creates an uninitialized session around a turn client.
    ///
    /// Call [`ConversationSession::start`] before submitting utterances.
    pub fn new(client: T) -> Self {
        Self {
            client,
            conversation_id: None,
            current_agent: String::new(),
            context: HashMap::new(),
            timeline: Vec::new(),
            events: EventLog::new(),
            agents: Vec::new(),
            guardrails: Vec::new(),
            side_action: SideActionState::None,
            busy: false,
            started: false,
        }
    }

    /// Issues the implicit first probe (`submit("", "")`).
    ///
    /// The response seeds the conversation identifier, current agent, and
    /// context, and replays any initial events, agents, guardrails, and
    /// messages.
    ///
    /// # Errors
    ///
    /// Returns a transport error if the probe fails (the session stays
    /// uninitialized and `start` may be called again), or a protocol error
    /// if the session was already started.
    pub async fn start(&mut self) -> Result<()> {
        if self.started {
            return Err(SkydeskError::protocol("session already started"));
        }

        let response = self.client.submit("", "").await?;
        self.apply_turn(response)?;
        self.started = true;
        tracing::debug!(
            conversation_id = self.conversation_id.as_deref().unwrap_or(""),
            agent = %self.current_agent,
            "session started"
        );
        Ok(())
    }

    /// Submits one user utterance and merges the resulting turn.
    ///
    /// The user message is appended to the timeline before the round trip
    /// resolves; the response compensates it with assistant messages but
    /// never removes or edits it. At most one turn may be in flight per
    /// session.
    ///
    /// # Errors
    ///
    /// - `SessionBusy` if a turn is already in flight (no state is touched)
    /// - `Transport` if the round trip fails; the busy flag is cleared, the
    ///   optimistic message stands, and no assistant message is appended
    /// - `Protocol` if the backend changed the established conversation id
    pub async fn submit_utterance(&mut self, text: &str) -> Result<()> {
        if self.busy {
            return Err(SkydeskError::SessionBusy);
        }

        self.timeline.push(ConversationMessage::user(text));
        self.busy = true;

        let conversation_id = self.conversation_id.clone().unwrap_or_default();
        let outcome = self.client.submit(text, &conversation_id).await;
        self.busy = false;

        self.apply_turn(outcome?)
    }

    /// Resolves the pending seat selection.
    ///
    /// Moves the side action to `Resolved` (permanent for the session) and
    /// synthesizes an ordinary user submit embedding the chosen seat. The
    /// seat-map trigger never re-opens afterwards, even though the sentinel
    /// message remains in the timeline.
    ///
    /// # Errors
    ///
    /// Returns a side-action error if no seat selection is pending, or any
    /// error of the synthesized submit.
    pub async fn resolve_side_action(&mut self, seat: &str) -> Result<()> {
        if self.busy {
            return Err(SkydeskError::SessionBusy);
        }
        if !self.side_action.is_prompting() {
            return Err(SkydeskError::SideAction(
                "no seat selection is pending".to_string(),
            ));
        }

        self.side_action = SideActionState::Resolved {
            seat: seat.to_string(),
        };
        self.submit_utterance(&format!("I would like seat {seat}"))
            .await
    }

    /// Merges one turn's authoritative snapshot into the session.
    ///
    /// The conversation id is first-write-wins; a changed established id
    /// aborts the merge before any state is mutated. Current agent, context,
    /// and the agent roster are replaced wholesale; events and messages are
    /// appended; guardrails are reconciled against the current agent's
    /// declared list.
    fn apply_turn(&mut self, response: TurnResponse) -> Result<()> {
        match &self.conversation_id {
            Some(existing) if *existing != response.conversation_id => {
                return Err(SkydeskError::protocol(format!(
                    "backend changed conversation id from {} to {}",
                    existing, response.conversation_id
                )));
            }
            Some(_) => {}
            None => self.conversation_id = Some(response.conversation_id.clone()),
        }

        self.current_agent = response.current_agent;
        self.context = response.context;
        self.agents = response.agents;

        self.events.append(response.events);
        for incoming in response.messages {
            self.timeline
                .push(ConversationMessage::assistant(incoming.content, incoming.agent));
        }

        let declared = self
            .agents
            .iter()
            .find(|agent| agent.name == self.current_agent)
            .map(|agent| agent.input_guardrails.clone())
            .unwrap_or_default();
        self.guardrails = reconcile(&declared, &response.guardrails);

        // Re-scan the whole timeline: the trigger is "a sentinel message
        // exists and has not been resolved", not "one just arrived".
        if has_seat_map_trigger(&self.timeline) && self.side_action == SideActionState::None {
            self.side_action = SideActionState::Prompting;
        }

        Ok(())
    }

    /// Produces the read-only view handed to the rendering layer.
    ///
    /// Sentinel control messages are filtered out here; they stay in the
    /// canonical timeline because the side-action re-scan depends on them.
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            messages: self
                .timeline
                .iter()
                .filter(|m| !(m.role == MessageRole::Assistant && m.content == SEAT_MAP_SENTINEL))
                .cloned()
                .collect(),
            busy: self.busy,
            current_agent: self.current_agent.clone(),
            context: self.context.clone(),
            events: self.events.as_slice().to_vec(),
            agents: self.agents.clone(),
            guardrails: self.guardrails.clone(),
            side_action: self.side_action.clone(),
        }
    }

    /// The backend-assigned conversation identifier, if established.
    pub fn conversation_id(&self) -> Option<&str> {
        self.conversation_id.as_deref()
    }

    /// `true` while a turn is in flight.
    pub fn is_busy(&self) -> bool {
        self.busy
    }

    /// The current seat-selection sub-state.
    pub fn side_action(&self) -> &SideActionState {
        &self.side_action
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::event::EventKind;
    use crate::session::turn::{IncomingEvent, IncomingMessage};
    use async_trait::async_trait;
    use chrono::Utc;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use uuid::Uuid;

    /// Mock TurnClient that replays scripted responses and records calls.
    struct MockTurnClient {
        responses: Mutex<VecDeque<Result<TurnResponse>>>,
        calls: Mutex<Vec<(String, String)>>,
    }

    impl MockTurnClient {
        fn new(responses: Vec<Result<TurnResponse>>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl TurnClient for MockTurnClient {
        async fn submit(&self, utterance: &str, conversation_id: &str) -> Result<TurnResponse> {
            self.calls
                .lock()
                .unwrap()
                .push((utterance.to_string(), conversation_id.to_string()));
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .expect("mock ran out of scripted responses")
        }
    }

    fn triage_roster() -> Vec<AgentDescriptor> {
        vec![AgentDescriptor {
            name: "Triage Agent".to_string(),
            description: "Routes customers to the right agent".to_string(),
            handoffs: vec!["Seat Booking Agent".to_string()],
            tools: vec![],
            input_guardrails: vec![
                "relevance_guardrail".to_string(),
                "jailbreak_guardrail".to_string(),
            ],
        }]
    }

    fn turn(conversation_id: &str, messages: Vec<(&str, &str)>) -> TurnResponse {
        TurnResponse {
            conversation_id: conversation_id.to_string(),
            current_agent: "Triage Agent".to_string(),
            context: HashMap::new(),
            events: vec![],
            agents: triage_roster(),
            guardrails: vec![],
            messages: messages
                .into_iter()
                .map(|(content, agent)| IncomingMessage {
                    content: content.to_string(),
                    agent: agent.to_string(),
                })
                .collect(),
        }
    }

    fn event(id: &str) -> IncomingEvent {
        IncomingEvent {
            id: id.to_string(),
            kind: EventKind::ToolCall,
            agent: "Triage Agent".to_string(),
            content: "update_seat".to_string(),
            metadata: None,
            timestamp: None,
        }
    }

    #[tokio::test]
    async fn test_start_seeds_conversation_id_and_reuses_it_verbatim() {
        let client = MockTurnClient::new(vec![
            Ok(turn("conv-1", vec![])),
            Ok(turn("conv-1", vec![("hello!", "Triage Agent")])),
        ]);
        let mut session = ConversationSession::new(client);

        session.start().await.unwrap();
        assert_eq!(session.conversation_id(), Some("conv-1"));

        session.submit_utterance("hi").await.unwrap();

        let calls = session.client.calls.lock().unwrap();
        assert_eq!(calls[0], ("".to_string(), "".to_string()));
        assert_eq!(calls[1], ("hi".to_string(), "conv-1".to_string()));
    }

    #[tokio::test]
    async fn test_double_start_is_a_protocol_error() {
        let client = MockTurnClient::new(vec![Ok(turn("conv-1", vec![]))]);
        let mut session = ConversationSession::new(client);

        session.start().await.unwrap();
        let err = session.start().await.unwrap_err();
        assert!(err.is_protocol());
    }

    #[tokio::test]
    async fn test_changed_conversation_id_aborts_merge() {
        let client = MockTurnClient::new(vec![
            Ok(turn("conv-1", vec![])),
            Ok(turn("conv-2", vec![("surprise", "Triage Agent")])),
        ]);
        let mut session = ConversationSession::new(client);
        session.start().await.unwrap();

        let err = session.submit_utterance("hi").await.unwrap_err();
        assert!(err.is_protocol());

        // Id untouched, no assistant message applied, session still usable.
        assert_eq!(session.conversation_id(), Some("conv-1"));
        assert!(!session.is_busy());
        let snapshot = session.snapshot();
        assert_eq!(snapshot.messages.len(), 1);
        assert_eq!(snapshot.messages[0].role, MessageRole::User);
    }

    #[tokio::test]
    async fn test_timeline_is_monotonic_across_turns() {
        let client = MockTurnClient::new(vec![
            Ok(turn("conv-1", vec![("welcome aboard", "Triage Agent")])),
            Ok(turn("conv-1", vec![("seat 4B it is", "Seat Booking Agent")])),
        ]);
        let mut session = ConversationSession::new(client);
        session.start().await.unwrap();

        let before: Vec<String> = session
            .snapshot()
            .messages
            .iter()
            .map(|m| m.id.clone())
            .collect();

        session.submit_utterance("I want seat 4B").await.unwrap();
        let after = session.snapshot().messages;

        assert_eq!(after.len(), before.len() + 2);
        for (idx, id) in before.iter().enumerate() {
            assert_eq!(&after[idx].id, id);
        }
        assert_eq!(after.last().unwrap().agent.as_deref(), Some("Seat Booking Agent"));
    }

    #[tokio::test]
    async fn test_events_accumulate_without_rewriting_history() {
        let mut first = turn("conv-1", vec![]);
        first.events = vec![event("e1")];
        let mut second = turn("conv-1", vec![]);
        second.events = vec![event("e2"), event("e3")];

        let client = MockTurnClient::new(vec![Ok(first), Ok(second)]);
        let mut session = ConversationSession::new(client);
        session.start().await.unwrap();

        let prior = session.snapshot().events;
        session.submit_utterance("status?").await.unwrap();
        let events = session.snapshot().events;

        assert_eq!(events.len(), prior.len() + 2);
        assert_eq!(events[0], prior[0]);
        assert_eq!(events[1].id, "e2");
        assert_eq!(events[2].id, "e3");
    }

    #[tokio::test]
    async fn test_second_submit_while_busy_is_rejected() {
        let client = MockTurnClient::new(vec![Ok(turn("conv-1", vec![]))]);
        let mut session = ConversationSession::new(client);
        session.start().await.unwrap();

        session.busy = true;
        let err = session.submit_utterance("am I through?").await.unwrap_err();
        assert!(err.is_busy());

        // The rejected submit touched nothing: no optimistic message, no call.
        assert!(session.snapshot().messages.is_empty());
        assert_eq!(session.client.calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_transport_failure_keeps_optimistic_message() {
        let client = MockTurnClient::new(vec![
            Ok(turn("conv-1", vec![])),
            Err(SkydeskError::transport("connection refused")),
        ]);
        let mut session = ConversationSession::new(client);
        session.start().await.unwrap();

        let err = session.submit_utterance("anyone there?").await.unwrap_err();
        assert!(err.is_transport());
        assert!(!session.is_busy());

        let messages = session.snapshot().messages;
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].content, "anyone there?");
        assert_eq!(messages[0].role, MessageRole::User);
    }

    #[tokio::test]
    async fn test_guardrails_reconciled_against_current_agent() {
        let mut response = turn("conv-1", vec![]);
        response.guardrails = vec![GuardrailCheck {
            id: Uuid::new_v4().to_string(),
            name: "相关性守卫".to_string(),
            input: "book a flight".to_string(),
            reasoning: String::new(),
            passed: true,
            timestamp: Utc::now(),
        }];

        let client = MockTurnClient::new(vec![Ok(response)]);
        let mut session = ConversationSession::new(client);
        session.start().await.unwrap();

        let guardrails = session.snapshot().guardrails;
        assert_eq!(guardrails.len(), 2);
        assert!(guardrails[0].passed);
        assert!(!guardrails[0].is_pending());
        assert!(guardrails[1].is_pending());
        assert!(!guardrails[1].passed);
    }

    #[tokio::test]
    async fn test_sentinel_enters_prompting_and_is_hidden_from_snapshot() {
        let client = MockTurnClient::new(vec![Ok(turn(
            "conv-1",
            vec![
                ("let me pull up the cabin map", "Seat Booking Agent"),
                (SEAT_MAP_SENTINEL, "Seat Booking Agent"),
            ],
        ))]);
        let mut session = ConversationSession::new(client);
        session.start().await.unwrap();

        assert!(session.side_action().is_prompting());

        let messages = session.snapshot().messages;
        assert_eq!(messages.len(), 1);
        assert!(messages.iter().all(|m| m.content != SEAT_MAP_SENTINEL));
    }

    #[tokio::test]
    async fn test_resolving_seat_synthesizes_utterance_and_never_reprompts() {
        let client = MockTurnClient::new(vec![
            Ok(turn("conv-1", vec![(SEAT_MAP_SENTINEL, "Seat Booking Agent")])),
            Ok(turn("conv-1", vec![("seat 23A confirmed", "Seat Booking Agent")])),
            // Backend re-sends the sentinel on a later turn.
            Ok(turn("conv-1", vec![(SEAT_MAP_SENTINEL, "Seat Booking Agent")])),
        ]);
        let mut session = ConversationSession::new(client);
        session.start().await.unwrap();
        assert!(session.side_action().is_prompting());

        session.resolve_side_action("23A").await.unwrap();
        assert_eq!(
            session.side_action(),
            &SideActionState::Resolved { seat: "23A".to_string() }
        );

        {
            let calls = session.client.calls.lock().unwrap();
            assert_eq!(calls.last().unwrap().0, "I would like seat 23A");
        }

        // The original sentinel stays in history and a fresh one arrives,
        // but the trigger must not re-arm.
        session.submit_utterance("thanks").await.unwrap();
        assert!(session.side_action().is_resolved());
    }

    #[tokio::test]
    async fn test_resolve_without_prompt_is_rejected() {
        let client = MockTurnClient::new(vec![Ok(turn("conv-1", vec![]))]);
        let mut session = ConversationSession::new(client);
        session.start().await.unwrap();

        let err = session.resolve_side_action("12C").await.unwrap_err();
        assert!(matches!(err, SkydeskError::SideAction(_)));
        assert_eq!(session.side_action(), &SideActionState::None);
    }

    #[tokio::test]
    async fn test_context_and_roster_replaced_wholesale() {
        let mut first = turn("conv-1", vec![]);
        first
            .context
            .insert("passenger_name".to_string(), serde_json::json!("Ada"));
        first
            .context
            .insert("flight_number".to_string(), serde_json::json!("SD-142"));

        let mut second = turn("conv-1", vec![]);
        second
            .context
            .insert("passenger_name".to_string(), serde_json::json!("Ada"));
        second.agents = vec![AgentDescriptor {
            name: "Triage Agent".to_string(),
            ..Default::default()
        }];

        let client = MockTurnClient::new(vec![Ok(first), Ok(second)]);
        let mut session = ConversationSession::new(client);
        session.start().await.unwrap();

        session.submit_utterance("drop my flight").await.unwrap();
        let snapshot = session.snapshot();
        // Not a diff: keys absent from the new snapshot are gone.
        assert!(!snapshot.context.contains_key("flight_number"));
        assert_eq!(snapshot.agents.len(), 1);
        assert!(snapshot.agents[0].input_guardrails.is_empty());
    }
}
