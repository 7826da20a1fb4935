//! Transport to the chat proxy.
//!
//! [`ChatTransport`] is the seam the session talks through; [`HttpProxyClient`]
//! is the real implementation that posts the transcript to `/api/chat`.

use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;
use urban_core::{ChatReply, ChatRequest, Message};

use crate::error::ChatError;

/// What the proxy answered: the HTTP status and the decoded body.
#[derive(Clone, Debug, PartialEq)]
pub struct ProxyResponse {
    pub status: u16,
    pub body: ChatReply,
}

impl ProxyResponse {
    pub fn new(status: u16, body: ChatReply) -> Self {
        Self { status, body }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Sends a full transcript to the proxy.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn send(&self, transcript: &[Message]) -> Result<ProxyResponse, ChatError>;
}

/// HTTP client for the chat proxy endpoint.
#[derive(Clone, Debug)]
pub struct HttpProxyClient {
    http: reqwest::Client,
    url: String,
}

impl HttpProxyClient {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, ChatError> {
        let url = url.into();
        if url.trim().is_empty() {
            return Err(ChatError::Config("proxy url is empty".to_string()));
        }
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { http, url })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl ChatTransport for HttpProxyClient {
    async fn send(&self, transcript: &[Message]) -> Result<ProxyResponse, ChatError> {
        let request = ChatRequest {
            messages: transcript.to_vec(),
        };
        let response = self.http.post(&self.url).json(&request).send().await?;
        let status = response.status().as_u16();
        let bytes = response.bytes().await?;
        debug!(status, len = bytes.len(), "Proxy responded");

        let body = match serde_json::from_slice::<ChatReply>(&bytes) {
            Ok(body) => body,
            // Error statuses fall back to a status-derived message upstream.
            Err(_) if !(200..300).contains(&status) => ChatReply::default(),
            Err(e) => return Err(ChatError::Decode(e.to_string())),
        };
        Ok(ProxyResponse { status, body })
    }
}
