use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{Result, UrbanError};

/// Top-level configuration for UrbanReporter.
///
/// Loaded from `~/.urban/config.toml` by default. The completion API key is
/// never stored here, only the name of the environment variable holding it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UrbanConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub upstream: UpstreamConfig,
    #[serde(default)]
    pub chat: ChatClientConfig,
}

impl UrbanConfig {
    /// Load configuration from a TOML file.
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: UrbanConfig = toml::from_str(&content)?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if the
    /// file does not exist or cannot be parsed.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    "Failed to load config from {}: {}. Using defaults.",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Save the current configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| UrbanError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level: trace, debug, info, warn, error.
    pub log_level: String,
    /// Data directory for the report and user database.
    pub data_dir: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            data_dir: "~/.urban/data".to_string(),
        }
    }
}

/// HTTP server settings for the chat proxy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Origins allowed to call the proxy. Empty means any origin.
    pub allowed_origins: Vec<String>,
    /// Maximum accepted request body size.
    pub body_limit_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5000,
            allowed_origins: Vec::new(),
            body_limit_bytes: 1024 * 1024,
        }
    }
}

/// External chat-completions API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Full URL of the OpenAI-compatible chat-completions endpoint.
    pub api_url: String,
    /// Model identifier sent with every completion request.
    pub model: String,
    /// Environment variable holding the bearer credential.
    pub api_key_env: String,
    /// Per-attempt timeout for the outbound call.
    pub timeout_secs: u64,
    /// Extra attempts after a transport failure. HTTP statuses are never retried.
    pub max_retries: u32,
    pub retry_backoff_ms: u64,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.groq.com/openai/v1/chat/completions".to_string(),
            model: "llama-3.1-8b-instant".to_string(),
            api_key_env: "GROQ_API_KEY".to_string(),
            timeout_secs: 15,
            max_retries: 1,
            retry_backoff_ms: 250,
        }
    }
}

/// Conversational client settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatClientConfig {
    /// URL of the chat proxy endpoint.
    pub proxy_url: String,
    /// Navigation target for the report workflow.
    pub report_route: String,
    /// Pause before redirecting to the report workflow.
    pub redirect_delay_ms: u64,
    /// Lowercase substrings that route a message to the report workflow.
    pub keywords: Vec<String>,
    /// Must outlast the proxy's worst case of every upstream attempt plus backoff.
    pub request_timeout_secs: u64,
}

impl Default for ChatClientConfig {
    fn default() -> Self {
        Self {
            proxy_url: "http://127.0.0.1:5000/api/chat".to_string(),
            report_route: "/report".to_string(),
            redirect_delay_ms: 800,
            keywords: ["report", "issue", "problem", "complaint"]
                .iter()
                .map(|k| k.to_string())
                .collect(),
            request_timeout_secs: 35,
        }
    }
}
