//! Conversational client for UrbanReporter.
//!
//! Keeps the visible transcript, routes report-like messages straight to the
//! report workflow, and otherwise consults the assistant through the chat
//! proxy, turning every failure into an assistant-shaped message.

pub mod error;
pub mod intent;
pub mod report;
pub mod session;
pub mod transport;

pub use error::ChatError;
pub use intent::{IntentDetector, KeywordIntent, DEFAULT_KEYWORDS};
pub use report::{extract_final_report, FinalReport};
pub use session::{ChatSession, Navigator, SendingFlag, SendingGuard, SubmitOutcome};
pub use transport::{ChatTransport, HttpProxyClient, ProxyResponse};
