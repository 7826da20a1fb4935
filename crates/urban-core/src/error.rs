use thiserror::Error;

/// Top-level error type for the UrbanReporter workspace.
///
/// Subsystem crates define their own error types and convert into or out of
/// `UrbanError` where they cross crate boundaries.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum UrbanError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<toml::de::Error> for UrbanError {
    fn from(err: toml::de::Error) -> Self {
        UrbanError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for UrbanError {
    fn from(err: toml::ser::Error) -> Self {
        UrbanError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for UrbanError {
    fn from(err: serde_json::Error) -> Self {
        UrbanError::Serialization(err.to_string())
    }
}

/// A specialized `Result` type for UrbanReporter operations.
pub type Result<T> = std::result::Result<T, UrbanError>;
