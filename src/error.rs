//! Error type shared by the key-value backends, the connection manager and
//! the notification store.

use thiserror::Error;

/// Failures surfaced by the store layer.
///
/// Not-found is never an error: lookups return `Ok(None)` or `Ok(false)`.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Backing store is not connected")]
    NotConnected,

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Persistence error: {0}")]
    Persistence(String),
}

impl StoreError {
    /// True when the caller sent bad input, false for server-side faults.
    pub fn is_client_fault(&self) -> bool {
        matches!(self, StoreError::Validation(_))
    }

    /// Short label used for metrics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            StoreError::Validation(_) => "validation",
            StoreError::NotConnected => "not_connected",
            StoreError::Connection(_) => "connection",
            StoreError::Persistence(_) => "persistence",
        }
    }
}

impl From<redis::RedisError> for StoreError {
    fn from(err: redis::RedisError) -> Self {
        StoreError::Persistence(err.to_string())
    }
}
