//! Conversational session: transcript, send gating, and the report redirect.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};
use urban_core::config::ChatClientConfig;
use urban_core::Message;

use crate::intent::{IntentDetector, KeywordIntent};
use crate::report::{extract_final_report, FinalReport};
use crate::transport::ChatTransport;

pub const GREETING: &str =
    "Hi there! I'm your UrbanReporter Assistant. How can I help you today?";
pub const REDIRECT_MESSAGE: &str = "Taking you to the Report page where you can log your issue. Please provide location and description there.";
pub const NO_REPLY_MESSAGE: &str = "I couldn't process that.";
pub const CONNECTION_FAILED_MESSAGE: &str = "Error connecting to AI.";

fn status_message(status: u16) -> String {
    format!("The assistant is unavailable right now (status {status}). Please try again.")
}

/// Moves the user to another part of the application.
pub trait Navigator: Send + Sync {
    fn navigate(&self, route: &str);
}

/// Shared "request outstanding" flag.
///
/// Clones observe the same state, so a UI can hold one to disable its send
/// control. Only a [`SendingGuard`] sets it, and dropping the guard clears it.
#[derive(Clone, Debug, Default)]
pub struct SendingFlag(Arc<AtomicBool>);

impl SendingFlag {
    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// Set the flag, unless it is already set.
    pub fn try_acquire(&self) -> Option<SendingGuard> {
        self.0
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| SendingGuard(Arc::clone(&self.0)))
    }
}

/// Clears the sending flag when dropped.
#[derive(Debug)]
pub struct SendingGuard(Arc<AtomicBool>);

impl Drop for SendingGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// What a call to [`ChatSession::submit`] did.
#[derive(Clone, Debug, PartialEq)]
pub enum SubmitOutcome {
    /// Blank input or a request already outstanding. Nothing changed.
    Ignored,
    /// Routed to the report workflow without consulting the assistant.
    Redirected { route: String },
    /// The assistant replied. Carries the final report if the reply had one.
    Replied { report: Option<FinalReport> },
    /// A fallback message was shown. `status` is `None` when the proxy
    /// could not be reached.
    Failed { status: Option<u16> },
}

/// One chat conversation with the assistant.
pub struct ChatSession {
    transport: Arc<dyn ChatTransport>,
    navigator: Arc<dyn Navigator>,
    intent: Box<dyn IntentDetector>,
    report_route: String,
    redirect_delay: Duration,
    messages: Vec<Message>,
    draft: String,
    sending: SendingFlag,
    last_report: Option<FinalReport>,
}

impl ChatSession {
    pub fn new(
        config: &ChatClientConfig,
        transport: Arc<dyn ChatTransport>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        Self {
            transport,
            navigator,
            intent: Box::new(KeywordIntent::new(&config.keywords)),
            report_route: config.report_route.clone(),
            redirect_delay: Duration::from_millis(config.redirect_delay_ms),
            messages: vec![Message::assistant(GREETING)],
            draft: String::new(),
            sending: SendingFlag::default(),
            last_report: None,
        }
    }

    /// Replace the intent strategy.
    pub fn with_intent(mut self, intent: Box<dyn IntentDetector>) -> Self {
        self.intent = intent;
        self
    }

    /// The visible transcript, oldest first.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn is_sending(&self) -> bool {
        self.sending.is_set()
    }

    /// Handle to the sending flag for observers.
    pub fn sending_flag(&self) -> SendingFlag {
        self.sending.clone()
    }

    /// Most recent report extracted from an assistant reply.
    pub fn last_report(&self) -> Option<&FinalReport> {
        self.last_report.as_ref()
    }

    pub fn draft(&self) -> &str {
        &self.draft
    }

    pub fn set_draft(&mut self, text: impl Into<String>) {
        self.draft = text.into();
    }

    /// Back to a greeting-only transcript with an empty draft.
    pub fn reset(&mut self) {
        self.messages = vec![Message::assistant(GREETING)];
        self.draft.clear();
        self.last_report = None;
    }

    /// Submit the draft. A blank draft, or any draft while a request is
    /// outstanding, is left in place.
    pub async fn send_draft(&mut self) -> SubmitOutcome {
        if self.draft.trim().is_empty() || self.is_sending() {
            return SubmitOutcome::Ignored;
        }
        let text = std::mem::take(&mut self.draft);
        self.submit(&text).await
    }

    /// Submit one user message.
    ///
    /// The sending flag is held for the whole call, including the redirect
    /// pause, and is cleared on every exit path, including the returned
    /// future being dropped.
    pub async fn submit(&mut self, text: &str) -> SubmitOutcome {
        if text.trim().is_empty() {
            return SubmitOutcome::Ignored;
        }
        let Some(_guard) = self.sending.try_acquire() else {
            debug!("Submit ignored while a request is outstanding");
            return SubmitOutcome::Ignored;
        };

        self.messages.push(Message::user(text));
        self.draft.clear();

        if self.intent.wants_report(text) {
            tokio::time::sleep(self.redirect_delay).await;
            self.navigator.navigate(&self.report_route);
            self.messages.push(Message::assistant(REDIRECT_MESSAGE));
            info!(route = %self.report_route, "Redirected to report workflow");
            return SubmitOutcome::Redirected {
                route: self.report_route.clone(),
            };
        }

        let result = self.transport.send(&self.messages).await;
        match result {
            Ok(response) if !response.is_success() => {
                warn!(status = response.status, "Proxy returned an error status");
                let text = response
                    .body
                    .reply
                    .unwrap_or_else(|| status_message(response.status));
                self.messages.push(Message::assistant(text));
                SubmitOutcome::Failed {
                    status: Some(response.status),
                }
            }
            Ok(response) => {
                let text = response
                    .body
                    .reply
                    .or(response.body.error)
                    .unwrap_or_else(|| NO_REPLY_MESSAGE.to_string());
                let report = match extract_final_report(&text) {
                    Ok(report) => report,
                    Err(e) => {
                        warn!("Ignoring final report: {}", e);
                        None
                    }
                };
                if let Some(ref report) = report {
                    info!(issue_type = %report.issue_type, "Assistant produced a final report");
                    self.last_report = Some(report.clone());
                }
                self.messages.push(Message::assistant(text));
                SubmitOutcome::Replied { report }
            }
            Err(e) => {
                warn!("Chat proxy unreachable: {}", e);
                self.messages.push(Message::assistant(CONNECTION_FAILED_MESSAGE));
                SubmitOutcome::Failed { status: None }
            }
        }
    }
}
