//! Client for the external OpenAI-compatible chat-completions API.
//!
//! One logical call per inbound request. Each attempt is bounded by the
//! configured timeout; an attempt that produced no HTTP response at all
//! (connect failure or timeout) may be retried up to `max_retries` times.
//! HTTP error statuses are returned to the caller as-is and never retried.

use std::time::Duration;

use serde::Serialize;
use urban_core::config::UpstreamConfig;
use urban_core::{Message, SYSTEM_PROMPT};

use crate::error::ProxyError;

/// One entry of the outbound `messages` array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutboundMessage<'a> {
    pub role: &'a str,
    pub content: &'a str,
}

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: Vec<OutboundMessage<'a>>,
}

/// Result of a completion call that reached the API and got a 2xx answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletionOutcome {
    /// `choices[0].message.content`, verbatim.
    Reply(String),
    /// The body was valid JSON but carried no usable content.
    NoContent,
}

/// Build the outbound message list: the system prompt first, then the
/// transcript projected to `{role, content}` in its original order.
pub fn build_messages(transcript: &[Message]) -> Vec<OutboundMessage<'_>> {
    std::iter::once(OutboundMessage {
        role: "system",
        content: SYSTEM_PROMPT,
    })
    .chain(transcript.iter().map(|m| OutboundMessage {
        role: m.role.as_str(),
        content: &m.text,
    }))
    .collect()
}

/// Pull `choices[0].message.content` out of a completion body.
///
/// Empty content counts as absent.
pub fn extract_content(body: &serde_json::Value) -> Option<String> {
    body.pointer("/choices/0/message/content")
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// HTTP client for the chat-completions endpoint.
///
/// Holds no per-request state; cloning shares the connection pool.
#[derive(Clone)]
pub struct CompletionClient {
    http: reqwest::Client,
    api_url: String,
    model: String,
    max_retries: u32,
    retry_backoff: Duration,
}

impl CompletionClient {
    pub fn new(config: &UpstreamConfig) -> Result<Self, ProxyError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            http,
            api_url: config.api_url.clone(),
            model: config.model.clone(),
            max_retries: config.max_retries,
            retry_backoff: Duration::from_millis(config.retry_backoff_ms),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Forward `transcript` to the completion API with the system prompt.
    pub async fn complete(
        &self,
        api_key: &str,
        transcript: &[Message],
    ) -> Result<CompletionOutcome, ProxyError> {
        let request = CompletionRequest {
            model: &self.model,
            messages: build_messages(transcript),
        };

        let response = self.send_with_retry(api_key, &request).await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProxyError::UpstreamStatus {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response.bytes().await?;
        let data: serde_json::Value =
            serde_json::from_slice(&bytes).map_err(|e| ProxyError::Decode(e.to_string()))?;
        tracing::debug!(raw = %data, "Completion API raw reply");

        Ok(match extract_content(&data) {
            Some(content) => CompletionOutcome::Reply(content),
            None => CompletionOutcome::NoContent,
        })
    }

    async fn send_with_retry(
        &self,
        api_key: &str,
        request: &CompletionRequest<'_>,
    ) -> Result<reqwest::Response, ProxyError> {
        let mut attempt: u32 = 0;
        loop {
            let result = self
                .http
                .post(&self.api_url)
                .bearer_auth(api_key)
                .json(request)
                .send()
                .await;

            match result {
                Ok(response) => return Ok(response),
                Err(e) if attempt < self.max_retries && is_transient(&e) => {
                    attempt += 1;
                    tracing::warn!(
                        error = %e,
                        attempt,
                        max_retries = self.max_retries,
                        "Completion API unreachable, retrying"
                    );
                    tokio::time::sleep(self.retry_backoff).await;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}

/// The connection was never established, so resending cannot duplicate a
/// completion. A timeout may have reached the model and is not retried.
fn is_transient(err: &reqwest::Error) -> bool {
    err.is_connect()
}
