use thiserror::Error;

/// Top-level error type for the capscope engine.
#[derive(Debug, Error)]
pub enum CapError {
    #[error("invalid provider table: {0}")]
    InvalidProvider(String),

    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),

    #[error("configuration error: {0}")]
    ConfigError(String),

    #[error("discovery pass failed: {0}")]
    DiscoveryFailed(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
