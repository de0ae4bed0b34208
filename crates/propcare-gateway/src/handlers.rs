// SPDX-FileCopyrightText: 2026 PropCare Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP request handlers: POST /v1/chat and GET /health.

use std::sync::Arc;

use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use propcare_core::PropcareError;
use propcare_core::types::{Message, Role, TenantIdentity, TriageState};
use serde::{Deserialize, Serialize};
use tracing::{error, warn};

use crate::server::GatewayState;

/// Request body for POST /v1/chat.
///
/// Either `messages` (a full transcript) or `message` (one new tenant
/// message, optionally with prior `history`) must be present.
#[derive(Debug, Default, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub messages: Option<Vec<Message>>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub history: Option<Vec<Message>>,
    #[serde(default)]
    pub tenant_name: Option<String>,
    #[serde(default)]
    pub tenant_email: Option<String>,
    #[serde(default)]
    pub tenant_phone: Option<String>,
    #[serde(default)]
    pub property_address: Option<String>,
    #[serde(default)]
    pub unit: Option<String>,
}

impl ChatRequest {
    fn identity(&self) -> TenantIdentity {
        TenantIdentity {
            tenant_name: self.tenant_name.clone(),
            tenant_email: self.tenant_email.clone(),
            tenant_phone: self.tenant_phone.clone(),
            property_address: self.property_address.clone(),
            unit: self.unit.clone(),
        }
    }

    /// Splits the request into (prior transcript, new tenant message).
    ///
    /// With `messages`, the last entry must be a tenant message and is the
    /// new one. With `message`, `history` is the prior transcript.
    fn into_turn(self) -> Result<(Vec<Message>, Message), PropcareError> {
        let (prior, latest) = match (self.messages, self.message) {
            (Some(mut messages), _) if !messages.is_empty() => {
                let latest = messages.pop().filter(|m| m.role == Role::User).ok_or_else(|| {
                    PropcareError::validation("last entry of 'messages' must be a user message")
                })?;
                (messages, latest)
            }
            (_, Some(text)) => (self.history.unwrap_or_default(), Message::user(text)?),
            _ => return Err(PropcareError::validation("Provide 'messages' or 'message'.")),
        };

        // Deserialized messages skip the constructor's checks.
        let prior = prior
            .into_iter()
            .map(|m| Message::new(m.role, m.content))
            .collect::<Result<Vec<_>, _>>()?;
        let latest = Message::user(latest.content)?;
        Ok((prior, latest))
    }
}

/// Response body for POST /v1/chat.
#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResponse {
    pub session_id: String,
    pub reply: String,
    pub ticket_created: bool,
    pub ticket_id: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn error_response(status: StatusCode, error: impl Into<String>) -> Response {
    (status, Json(ErrorResponse { error: error.into() })).into_response()
}

/// POST /v1/chat
///
/// Runs one triage turn. Turns for the same session are serialized. A
/// stored session's transcript and identity take precedence over the
/// request's `history` and identity fields.
pub async fn post_chat(State(state): State<GatewayState>, Json(body): Json<ChatRequest>) -> Response {
    let session_id = body
        .session_id
        .clone()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    let identity = body.identity();
    let (history, latest) = match body.into_turn() {
        Ok(parts) => parts,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, e.to_string()),
    };

    let lock = state
        .session_locks
        .entry(session_id.clone())
        .or_default()
        .clone();
    let response = {
        let _guard = lock.lock().await;
        run_chat_turn(&state, &session_id, identity, history, latest).await
    };
    drop(lock);
    state
        .session_locks
        .remove_if(&session_id, |_, l| Arc::strong_count(l) == 1);

    response
}

async fn run_chat_turn(
    state: &GatewayState,
    session_id: &str,
    identity: TenantIdentity,
    history: Vec<Message>,
    latest: Message,
) -> Response {
    let mut session = match state.sessions.load_session(session_id).await {
        Ok(Some(stored)) => stored,
        Ok(None) => {
            let mut fresh = TriageState::new(session_id, identity);
            fresh.messages = history;
            fresh
        }
        Err(e) => {
            error!(session_id, error = %e, "failed to load session");
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, "internal_error");
        }
    };

    let prior_len = session.messages.len();
    session.messages.push(latest);

    match state.orchestrator.run_turn(&mut session).await {
        Ok(outcome) => {
            if let Err(e) = state.sessions.save_session(&session).await {
                error!(session_id, error = %e, "failed to save session");
                return error_response(StatusCode::INTERNAL_SERVER_ERROR, "internal_error");
            }
            (
                StatusCode::OK,
                Json(ChatResponse {
                    session_id: session_id.to_string(),
                    reply: outcome.reply,
                    ticket_created: outcome.ticket_created,
                    ticket_id: Some(outcome.ticket_id),
                }),
            )
                .into_response()
        }
        Err(e) => {
            warn!(session_id, error = %e, "chat turn failed");
            if session.ticket_id.is_some() {
                // Keep the ticket binding so a retry does not open a second ticket.
                session.messages.truncate(prior_len);
                if let Err(save_err) = state.sessions.save_session(&session).await {
                    error!(session_id, error = %save_err, "failed to save ticket binding");
                }
            }
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "internal_error")
        }
    }
}

/// GET /health
pub async fn get_health(State(state): State<GatewayState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
    })
}
