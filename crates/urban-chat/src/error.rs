//! Error types for the conversational client.

use urban_core::UrbanError;

/// Errors from the chat client.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("proxy request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("proxy returned an unreadable body: {0}")]
    Decode(String),
    #[error("final report block is malformed: {0}")]
    MalformedReport(String),
    #[error("configuration error: {0}")]
    Config(String),
}

impl From<ChatError> for UrbanError {
    fn from(err: ChatError) -> Self {
        match err {
            ChatError::Config(msg) => UrbanError::Config(msg),
            other => UrbanError::Api(other.to_string()),
        }
    }
}
