//! Error types for the paginator and its collection transport.

use thiserror::Error;

/// Main error type for paging operations.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum PagerError {
    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Subscription cancelled: {0}")]
    SubscriptionCancelled(String),

    #[error("Subscription dropped by transport")]
    SubscriptionDropped,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Failed to start paginator worker: {0}")]
    WorkerSpawn(String),

    #[error("Paginator is no longer running")]
    Disconnected,
}

impl From<serde_json::Error> for PagerError {
    fn from(e: serde_json::Error) -> Self {
        PagerError::Serialization(e.to_string())
    }
}

/// Result type for paging operations.
pub type Result<T> = std::result::Result<T, PagerError>;
