//! Domain-level error taxonomy for monopub.

/// Monopub domain errors.
#[derive(Debug, thiserror::Error)]
pub enum MonopubError {
    #[error("git error: {0}")]
    Git(String),

    #[error("registry error: {0}")]
    Registry(String),

    #[error("manifest error: {0}")]
    Manifest(String),

    #[error("command error: {0}")]
    Command(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for monopub domain operations.
pub type Result<T> = std::result::Result<T, MonopubError>;
