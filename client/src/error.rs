//! Unified error handling for sync operations.

use std::fmt;

/// The sync operation an error belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Fetch,
    Save,
    Create,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Operation::Fetch => "fetch",
            Operation::Save => "save",
            Operation::Create => "create",
        })
    }
}

/// Failure talking to the remote.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{method} {url} returned status {status}")]
    Status {
        method: &'static str,
        url: String,
        status: u16,
    },

    #[error("invalid response: {0}")]
    Decode(String),

    #[error("not found: {0}")]
    NotFound(String),

    /// Raised by the in-memory remote when a failure is scheduled.
    #[error("injected failure: {0}")]
    Injected(String),
}

/// Errors surfaced by [`SyncClient`](crate::SyncClient).
///
/// Every variant names the operation and, once known, the collection, so the
/// caller can retry the whole operation.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("{operation} {collection}: not a valid streak set (description {found:?})")]
    Schema {
        operation: Operation,
        collection: String,
        found: String,
    },

    #[error("{operation} {collection}: {source}")]
    Transport {
        operation: Operation,
        collection: String,
        #[source]
        source: TransportError,
    },

    #[error("{operation} {}: unauthorized, no credential configured", label(collection))]
    Unauthorized {
        operation: Operation,
        collection: Option<String>,
    },

    #[error("{operation} {}: set has not been created remotely yet", label(collection))]
    NotCreated {
        operation: Operation,
        collection: Option<String>,
    },

    #[error("{operation} {collection}: {source}")]
    InvalidSnapshot {
        operation: Operation,
        collection: String,
        #[source]
        source: streaks_engine::Error,
    },
}

/// Label for a collection that has no remote id yet.
pub(crate) const UNSAVED: &str = "(new)";

fn label(collection: &Option<String>) -> &str {
    collection.as_deref().unwrap_or(UNSAVED)
}

impl SyncError {
    pub(crate) fn transport(
        operation: Operation,
        collection: impl Into<String>,
        source: TransportError,
    ) -> Self {
        SyncError::Transport {
            operation,
            collection: collection.into(),
            source,
        }
    }

    /// Wrap an engine error, keeping schema mismatches distinct.
    pub(crate) fn engine(
        operation: Operation,
        collection: impl Into<String>,
        source: streaks_engine::Error,
    ) -> Self {
        let collection = collection.into();
        match source {
            streaks_engine::Error::SchemaMismatch { found, .. } => SyncError::Schema {
                operation,
                collection,
                found,
            },
            source => SyncError::InvalidSnapshot {
                operation,
                collection,
                source,
            },
        }
    }

    pub fn operation(&self) -> Operation {
        match self {
            SyncError::Schema { operation, .. }
            | SyncError::Transport { operation, .. }
            | SyncError::Unauthorized { operation, .. }
            | SyncError::NotCreated { operation, .. }
            | SyncError::InvalidSnapshot { operation, .. } => *operation,
        }
    }
}

/// Result type alias for sync operations.
pub type Result<T> = std::result::Result<T, SyncError>;
