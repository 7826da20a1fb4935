//! Proxy error types and their user-safe JSON responses.
//!
//! The `Display` output of a [`ProxyError`] carries diagnostic detail for
//! server logs. The HTTP body built by `into_response` never does: callers
//! only ever see one of the fixed messages below.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use urban_core::ChatReply;

/// Returned when `messages` is missing or not an array.
pub const MESSAGES_REQUIRED: &str = "Messages array is required";
/// Returned when an element of `messages` is not a valid transcript entry.
pub const INVALID_MESSAGE: &str =
    "Each message needs a role of user or assistant and a text string";
pub const METHOD_NOT_ALLOWED: &str = "Method not allowed";
pub const CONFIGURATION_ERROR_REPLY: &str = "Server configuration error. Please contact support.";
pub const UNAVAILABLE_REPLY: &str = "AI service temporarily unavailable. Please try again later.";
pub const SERVER_ERROR_REPLY: &str = "AI server error. Try again later.";
/// In-band reply when the upstream succeeded but carried no content.
pub const NO_CONTENT_REPLY: &str =
    "AI did not respond properly. Please check your API key or try again.";

/// Errors raised while serving `POST /api/chat`.
#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    #[error("invalid request: {0}")]
    InvalidRequest(&'static str),
    #[error("method not allowed")]
    MethodNotAllowed,
    #[error("completion API credential is not configured")]
    MissingCredential,
    #[error("completion API returned {status}: {body}")]
    UpstreamStatus { status: u16, body: String },
    #[error("completion API transport failure: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("completion API returned undecodable body: {0}")]
    Decode(String),
}

impl ProxyError {
    pub fn status(&self) -> StatusCode {
        match self {
            ProxyError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ProxyError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ProxyError::MissingCredential
            | ProxyError::UpstreamStatus { .. }
            | ProxyError::Transport(_)
            | ProxyError::Decode(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The body sent to the caller.
    pub fn body(&self) -> ChatReply {
        match self {
            ProxyError::InvalidRequest(msg) => ChatReply::error(*msg),
            ProxyError::MethodNotAllowed => ChatReply::error(METHOD_NOT_ALLOWED),
            ProxyError::MissingCredential => ChatReply::reply(CONFIGURATION_ERROR_REPLY),
            ProxyError::UpstreamStatus { .. } => ChatReply::reply(UNAVAILABLE_REPLY),
            ProxyError::Transport(_) | ProxyError::Decode(_) => {
                ChatReply::reply(SERVER_ERROR_REPLY)
            }
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        (self.status(), Json(self.body())).into_response()
    }
}
