//! Error types for vecstash.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, VecStashError>;

#[derive(Debug, Error)]
pub enum VecStashError {
    /// Invalid or missing configuration (bad embedder, unreadable config file).
    #[error("Configuration error: {0}")]
    Config(String),

    /// Caller passed arguments the store cannot accept.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Embedder not found: {0}")]
    EmbedderNotFound(String),

    #[error("API key missing for embedder: {0}")]
    ApiKeyMissing(String),

    /// The embedding provider failed or returned malformed data.
    #[error("Provider error: {0}")]
    Provider(String),

    #[error("HTTP error: {0}")]
    Http(String),

    /// A read or flush against the document table failed.
    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

impl VecStashError {
    /// True for errors raised by the embedding provider boundary.
    pub fn is_provider_failure(&self) -> bool {
        matches!(self, Self::Provider(_) | Self::Http(_))
    }
}
