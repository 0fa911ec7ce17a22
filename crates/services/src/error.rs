//! Shared error types for the services crate.

use thiserror::Error;

/// Errors emitted by the backend client.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ApiError {
    #[error("progress api is not configured")]
    NotConfigured,
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error("progress api request failed with status {0}")]
    HttpStatus(reqwest::StatusCode),
    #[error("progress api did not answer within {after_ms} ms")]
    Timeout { after_ms: u64 },
    #[error("progress api returned an unreadable body: {0}")]
    Decode(String),
    #[error("cannot build progress api url: {0}")]
    InvalidUrl(String),
}

/// Errors emitted while reading `SyncConfig` from the environment.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("invalid base url {value:?}: {reason}")]
    InvalidBaseUrl { value: String, reason: String },
    #[error("{name} must be a non-negative integer, got {value:?}")]
    InvalidNumber { name: &'static str, value: String },
}
