use serde::{Deserialize, Serialize};

// =============================================================================
// Chat transcript
// =============================================================================

/// Speaker of a transcript message.
///
/// The system role exists only on the outbound completion request and is
/// never part of a client transcript.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of the conversation transcript, as exchanged on the wire.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub text: String,
}

impl Message {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            text: text.into(),
        }
    }
}

/// Body of `POST /api/chat`: the full transcript, resent on every call.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChatRequest {
    pub messages: Vec<Message>,
}

/// Proxy response body. Success and fallback replies both use `reply`;
/// request-shape failures use `error`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatReply {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ChatReply {
    pub fn reply(text: impl Into<String>) -> Self {
        Self {
            reply: Some(text.into()),
            error: None,
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            reply: None,
            error: Some(text.into()),
        }
    }
}

// =============================================================================
// Reports
// =============================================================================

/// Issue type used when none is supplied.
pub const DEFAULT_ISSUE_TYPE: &str = "General";

/// A civic-issue report before it is filed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReportDraft {
    pub reporter: String,
    pub issue_type: String,
    pub location: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Role::User).unwrap(), "\"user\"");
        assert_eq!(
            serde_json::to_string(&Role::Assistant).unwrap(),
            "\"assistant\""
        );
    }

    #[test]
    fn test_role_rejects_system() {
        let result: Result<Role, _> = serde_json::from_str("\"system\"");
        assert!(result.is_err());
    }

    #[test]
    fn test_message_wire_shape() {
        let msg = Message::user("hello");
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json, serde_json::json!({"role": "user", "text": "hello"}));
    }

    #[test]
    fn test_chat_reply_omits_absent_fields() {
        let json = serde_json::to_value(ChatReply::reply("hi")).unwrap();
        assert_eq!(json, serde_json::json!({"reply": "hi"}));

        let json = serde_json::to_value(ChatReply::error("bad")).unwrap();
        assert_eq!(json, serde_json::json!({"error": "bad"}));
    }

    #[test]
    fn test_chat_reply_tolerates_unknown_fields() {
        let reply: ChatReply =
            serde_json::from_str(r#"{"reply": "ok", "model": "x"}"#).unwrap();
        assert_eq!(reply.reply.as_deref(), Some("ok"));
        assert!(reply.error.is_none());
    }
}
