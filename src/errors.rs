//! Error hierarchy for the coordination layer
//!
//! Errors are grouped by where they come from: the remote coordination
//! service, the payload codec, the membership watcher and configuration.

use config::ConfigError;
use tokio::task::JoinError;

#[doc(hidden)]
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Failure of a remote list/create/delete/get call
    #[error(transparent)]
    Remote(#[from] RemoteError),

    /// Payload could not be encoded or decoded
    #[error(transparent)]
    Serialization(#[from] SerializationError),

    /// Create attempted against a path that already holds a node
    #[error("Node already exists at {path}")]
    Conflict { path: String },

    /// Membership watcher failures
    #[error(transparent)]
    Watch(#[from] WatchError),

    /// Configuration source could not be loaded or parsed
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Configuration loaded but violates a rule
    #[error("Invalid config: {0}")]
    InvalidConfig(String),
}

impl Error {
    pub fn is_conflict(&self) -> bool {
        matches!(self, Error::Conflict { .. })
    }

    pub fn is_no_node(&self) -> bool {
        matches!(self, Error::Remote(RemoteError::NoNode { .. }))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    /// Target node (or the parent of a node being created) does not exist
    #[error("No node at {path}")]
    NoNode { path: String },

    /// Delete refused because the node still has children
    #[error("Node {path} has children")]
    NotEmpty { path: String },

    /// Conditional delete against a stale version
    #[error("Version mismatch at {path}: expected {expected}, found {actual}")]
    BadVersion {
        path: String,
        expected: i32,
        actual: i32,
    },

    /// Malformed path or argument rejected before reaching the tree
    #[error("Bad arguments: {0}")]
    BadArguments(String),

    /// Connection to the ensemble was lost mid-call
    #[error("Connection to coordination service lost")]
    ConnectionLoss,

    /// Service refused or could not serve the request
    #[error("Coordination service unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, thiserror::Error)]
pub enum SerializationError {
    #[error("Failed to encode payload: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("Failed to decode payload: {0}")]
    Decode(#[source] serde_json::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    /// Re-listing children during a reconciliation pass failed; the watch is dead
    #[error("Reconciliation of {path} failed: {source}")]
    Reconcile {
        path: String,
        #[source]
        source: Box<Error>,
    },

    /// The change callback panicked; the watcher stopped after the pass
    #[error("Change callback for {path} panicked: {reason}")]
    CallbackPanicked { path: String, reason: String },

    #[error("Watcher task failed: {0}")]
    TaskFailed(#[from] JoinError),
}
