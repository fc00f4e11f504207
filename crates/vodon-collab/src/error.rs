//! Error types for the replication layer.

use thiserror::Error;

/// Errors raised while talking to the replication service.
#[derive(Debug, Error)]
pub enum CollabError {
    /// The service could not be reached.
    #[error("Replication service unavailable: {0}")]
    Unavailable(String),

    /// The client must be activated before attaching documents.
    #[error("Replication client {client_id} is not active")]
    Inactive { client_id: String },

    /// The document is not attached to this client.
    #[error("Document {key} is not attached")]
    NotAttached { key: String },

    /// A replicated entry did not parse as the expected record.
    #[error("Malformed {container} entry {id}: {reason}")]
    MalformedPayload {
        container: &'static str,
        id: String,
        reason: String,
    },

    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Every attach attempt allowed by the backoff policy failed.
    #[error("Gave up attaching {room} after {attempts} attempts")]
    RetriesExhausted { room: String, attempts: u32 },
}

/// Result type alias for replication operations.
pub type CollabResult<T> = std::result::Result<T, CollabError>;
