//! Application state shared across all route handlers.
//!
//! AppState holds the completion client and where to find the credential.
//! Nothing in it changes between requests.

use std::sync::Arc;
use std::time::Instant;

use urban_core::UrbanConfig;

use crate::error::ProxyError;
use crate::upstream::CompletionClient;

/// Where the completion API credential comes from.
///
/// Resolved on every request, so a key exported after startup is picked up
/// without a restart. Empty values count as missing.
#[derive(Clone, Debug)]
pub enum ApiKeySource {
    /// Read the named environment variable.
    Env(String),
    /// A fixed value, used by tests and embedders.
    Fixed(Option<String>),
}

impl ApiKeySource {
    pub fn resolve(&self) -> Option<String> {
        let key = match self {
            ApiKeySource::Env(name) => std::env::var(name).ok(),
            ApiKeySource::Fixed(value) => value.clone(),
        };
        key.filter(|k| !k.trim().is_empty())
    }
}

/// Shared application state.
///
/// All fields are cheap to clone; handlers hold no mutable shared state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<UrbanConfig>,
    pub completion: CompletionClient,
    pub api_key: ApiKeySource,
    /// Server start time for uptime calculation.
    pub start_time: Instant,
}

impl AppState {
    /// Build state from configuration, reading the key from the configured
    /// environment variable.
    pub fn new(config: UrbanConfig) -> Result<Self, ProxyError> {
        let api_key = ApiKeySource::Env(config.upstream.api_key_env.clone());
        Self::with_api_key(config, api_key)
    }

    pub fn with_api_key(config: UrbanConfig, api_key: ApiKeySource) -> Result<Self, ProxyError> {
        let completion = CompletionClient::new(&config.upstream)?;
        Ok(Self {
            config: Arc::new(config),
            completion,
            api_key,
            start_time: Instant::now(),
        })
    }
}
