use thiserror::Error;

use crate::artifact::types::UnresolvableReason;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Network error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Rate limited: retry after {retry_after_secs:?} seconds")]
    RateLimited { retry_after_secs: Option<u64> },

    #[error("Artifact not found: {0}")]
    NotFound(String),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Invalid registry URL: {0}")]
    InvalidUrl(String),

    #[error("Unexpected status: {0}")]
    Status(reqwest::StatusCode),
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Failed to run {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{command} failed: {stderr}")]
    CommandFailed { command: String, stderr: String },

    #[error("Invalid catalog entry: {0}")]
    InvalidEntry(String),
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Failed to run {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Pull of {reference} failed: {stderr}")]
    PullFailed { reference: String, stderr: String },

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error("Inspect task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("Unresolvable: {0}")]
    Unresolvable(UnresolvableReason),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Catalog task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}
