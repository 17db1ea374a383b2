//! Reqwest implementation of the `TurnClient` seam.
//!
//! One blocking round trip per submit, no retries: a turn either completes
//! or fails terminally, and a failure means no state was applied.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use skydesk_core::session::{
    AgentDescriptor, EventKind, GuardrailCheck, IncomingEvent, IncomingMessage, TurnClient,
    TurnResponse,
};
use skydesk_core::{Result, SkydeskError};

use crate::config::BackendConfig;

/// HTTP client for the backend's `/chat` endpoint.
#[derive(Debug, Clone)]
pub struct ChatApiClient {
    http: Client,
    config: BackendConfig,
}

impl ChatApiClient {
    /// Builds a client from the given configuration.
    ///
    /// # Errors
    ///
    /// Returns a config error for an invalid base URL, or an internal error
    /// if the underlying HTTP client cannot be constructed.
    pub fn new(config: BackendConfig) -> Result<Self> {
        config.validate()?;
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| SkydeskError::internal(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { http, config })
    }

    async fn send_request(&self, body: &ChatRequest) -> Result<TurnResponse> {
        let response = self
            .http
            .post(self.config.chat_url())
            .json(body)
            .send()
            .await
            .map_err(|e| SkydeskError::transport(format!("chat request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response
                .text()
                .await
                .unwrap_or_else(|_| "failed to read error body".to_string());
            return Err(map_http_error(status, body_text));
        }

        let parsed: WireChatResponse = response
            .json()
            .await
            .map_err(|e| SkydeskError::transport(format!("failed to decode chat response: {e}")))?;

        Ok(parsed.into_domain())
    }
}

#[async_trait]
impl TurnClient for ChatApiClient {
    async fn submit(&self, utterance: &str, conversation_id: &str) -> Result<TurnResponse> {
        let request = ChatRequest {
            conversation_id: conversation_id.to_string(),
            message: utterance.to_string(),
        };
        tracing::debug!(
            conversation_id,
            chars = utterance.len(),
            "submitting turn"
        );
        self.send_request(&request).await
    }
}

#[derive(Serialize)]
struct ChatRequest {
    conversation_id: String,
    message: String,
}

/// The backend's `/chat` response, field for field.
///
/// Every list field defaults to empty: the backend omits what a turn did not
/// produce, and an absent field must never fail the decode.
#[derive(Debug, Deserialize)]
struct WireChatResponse {
    conversation_id: String,
    current_agent: String,
    #[serde(default)]
    messages: Vec<IncomingMessage>,
    #[serde(default)]
    events: Vec<WireEvent>,
    #[serde(default)]
    context: HashMap<String, serde_json::Value>,
    #[serde(default)]
    agents: Vec<AgentDescriptor>,
    #[serde(default)]
    guardrails: Vec<WireGuardrail>,
}

/// Events arrive with a `type` tag and an optional epoch-millis timestamp.
#[derive(Debug, Deserialize)]
struct WireEvent {
    id: String,
    #[serde(rename = "type")]
    kind: EventKind,
    agent: String,
    #[serde(default)]
    content: String,
    #[serde(default)]
    metadata: Option<serde_json::Value>,
    #[serde(default)]
    timestamp: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct WireGuardrail {
    id: String,
    name: String,
    #[serde(default)]
    input: String,
    #[serde(default)]
    reasoning: String,
    passed: bool,
    #[serde(default)]
    timestamp: Option<f64>,
}

/// Converts an epoch-milliseconds float to a UTC timestamp.
///
/// An unrepresentable value is treated as absent, so the session stamps the
/// arrival time instead of corrupting the log.
fn millis_to_datetime(millis: f64) -> Option<DateTime<Utc>> {
    if !millis.is_finite() {
        return None;
    }
    DateTime::from_timestamp_millis(millis as i64)
}

impl WireChatResponse {
    fn into_domain(self) -> TurnResponse {
        TurnResponse {
            conversation_id: self.conversation_id,
            current_agent: self.current_agent,
            context: self.context,
            events: self
                .events
                .into_iter()
                .map(|e| IncomingEvent {
                    id: e.id,
                    kind: e.kind,
                    agent: e.agent,
                    content: e.content,
                    metadata: e.metadata,
                    timestamp: e.timestamp.and_then(millis_to_datetime),
                })
                .collect(),
            agents: self.agents,
            guardrails: self
                .guardrails
                .into_iter()
                .map(|g| GuardrailCheck {
                    id: g.id,
                    name: g.name,
                    input: g.input,
                    reasoning: g.reasoning,
                    passed: g.passed,
                    timestamp: g
                        .timestamp
                        .and_then(millis_to_datetime)
                        .unwrap_or_else(Utc::now),
                })
                .collect(),
            messages: self.messages,
        }
    }
}

#[derive(Deserialize)]
struct ErrorResponse {
    detail: serde_json::Value,
}

fn map_http_error(status: StatusCode, body: String) -> SkydeskError {
    let message = serde_json::from_str::<ErrorResponse>(&body)
        .map(|wrapper| wrapper.detail.to_string())
        .unwrap_or(body);
    SkydeskError::transport_with_status(
        format!("backend returned {status}: {message}"),
        status.as_u16(),
    )
}
