//! UrbanReporter API crate - axum HTTP server for the chat proxy.
//!
//! Accepts a conversation transcript on `POST /api/chat`, prepends the
//! system prompt, forwards it to the external chat-completions API once,
//! and relays the reply (or a user-safe fallback) to the caller.

pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;
pub mod upstream;

pub use error::ProxyError;
pub use routes::{create_router, start_server};
pub use state::{ApiKeySource, AppState};
pub use upstream::{CompletionClient, CompletionOutcome};
