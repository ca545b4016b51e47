//! Error types for the streaks engine.

use thiserror::Error;

/// All possible errors from the streaks engine.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    // Snapshot errors
    #[error("not a valid streak set: expected description {expected:?}, got {found:?}")]
    SchemaMismatch { expected: String, found: String },

    #[error("invalid record '{name}': {reason}")]
    InvalidRecord { name: String, reason: String },

    #[error("missing content for file '{0}'")]
    MissingContent(String),

    // Log errors
    #[error("malformed log entry {id}: {reason}")]
    MalformedEntry { id: String, reason: String },

    #[error("invalid change descriptor: {0}")]
    InvalidDescriptor(String),

    #[error("invalid counter delta {0:?}: expected a signed integer such as \"+2\" or \"-1\"")]
    InvalidDelta(String),

    #[error("serialization failed: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;
