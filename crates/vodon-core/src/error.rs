//! Error types for Vodon.

use thiserror::Error;

/// Errors raised by the media boundary and by persistence.
///
/// Missing videos or bookmarks in the timeline are not errors; those
/// operations are no-ops.
#[derive(Error, Debug)]
pub enum VodonError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Media error: {0}")]
    Media(String),

    #[error("Probe error: {0}")]
    Probe(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("File version {found} is newer than supported version {supported}")]
    UnsupportedVersion { found: u64, supported: u32 },
}

/// Result type alias for Vodon operations.
pub type Result<T> = std::result::Result<T, VodonError>;
