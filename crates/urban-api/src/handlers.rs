//! Route handler functions for the chat proxy.
//!
//! `chat` validates the transcript, resolves the credential, makes exactly
//! one logical upstream call and maps every outcome to a `{reply}` or
//! `{error}` body. Diagnostic detail goes to the log, never to the caller.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::Json;
use serde::{Deserialize, Serialize};

use urban_core::{ChatReply, Message, Role};

use crate::error::{ProxyError, INVALID_MESSAGE, MESSAGES_REQUIRED, NO_CONTENT_REPLY};
use crate::state::AppState;
use crate::upstream::CompletionOutcome;

// =============================================================================
// Response types
// =============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
    pub model: String,
}

// =============================================================================
// Request parsing
// =============================================================================

/// Validate the request body into a transcript.
///
/// The body must be declared JSON and carry a `messages` array whose
/// elements are `{role: "user"|"assistant", text: string}`.
pub fn parse_transcript(headers: &HeaderMap, body: &[u8]) -> Result<Vec<Message>, ProxyError> {
    let is_json = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|ct| ct.to_ascii_lowercase().contains("json"))
        .unwrap_or(false);
    if !is_json {
        return Err(ProxyError::InvalidRequest(MESSAGES_REQUIRED));
    }

    let mut value: serde_json::Value = serde_json::from_slice(body)
        .map_err(|_| ProxyError::InvalidRequest(MESSAGES_REQUIRED))?;

    let messages = match value.get_mut("messages") {
        Some(m) if m.is_array() => m.take(),
        _ => return Err(ProxyError::InvalidRequest(MESSAGES_REQUIRED)),
    };

    serde_json::from_value(messages).map_err(|_| ProxyError::InvalidRequest(INVALID_MESSAGE))
}

// =============================================================================
// Handler functions
// =============================================================================

/// POST /api/chat - forward the transcript to the completion API.
pub async fn chat(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<ChatReply>, ProxyError> {
    let result = relay(&state, &headers, &body).await;
    if let Err(ref e) = result {
        log_failure(e);
    }
    result.map(Json)
}

async fn relay(state: &AppState, headers: &HeaderMap, body: &[u8]) -> Result<ChatReply, ProxyError> {
    let transcript = parse_transcript(headers, body)?;

    let api_key = state.api_key.resolve().ok_or(ProxyError::MissingCredential)?;

    if let Some(last) = transcript.iter().rev().find(|m| m.role == Role::User) {
        tracing::debug!(
            messages = transcript.len(),
            last_user_message = %last.text,
            "Incoming chat request"
        );
    }

    match state.completion.complete(&api_key, &transcript).await? {
        CompletionOutcome::Reply(content) => Ok(ChatReply::reply(content)),
        CompletionOutcome::NoContent => {
            tracing::warn!("Completion API response carried no message content");
            Ok(ChatReply::reply(NO_CONTENT_REPLY))
        }
    }
}

fn log_failure(err: &ProxyError) {
    match err {
        ProxyError::InvalidRequest(reason) => {
            tracing::debug!(reason, "Rejected malformed chat request");
        }
        ProxyError::MethodNotAllowed => {}
        ProxyError::MissingCredential => {
            tracing::error!("Completion API credential is not configured");
        }
        ProxyError::UpstreamStatus { status, body } => {
            tracing::error!(status, body = %body, "Completion API returned an error status");
        }
        ProxyError::Transport(e) => {
            tracing::error!(error = %e, "Completion API call failed");
        }
        ProxyError::Decode(e) => {
            tracing::error!(error = %e, "Completion API returned invalid JSON");
        }
    }
}

/// OPTIONS /api/chat - CORS preflight. Headers are added by the CORS layer.
pub async fn preflight() -> StatusCode {
    StatusCode::OK
}

/// Any other verb on /api/chat.
pub async fn method_not_allowed() -> ProxyError {
    ProxyError::MethodNotAllowed
}

/// GET /health - liveness plus basic runtime info.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
        model: state.completion.model().to_string(),
    })
}

/// GET / - plain-text banner.
pub async fn root() -> &'static str {
    "UrbanReporter AI API is running."
}
