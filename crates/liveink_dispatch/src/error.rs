//! Dispatch error types

use thiserror::Error;

/// Errors from cross-thread dispatch
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    /// The destination dispatcher has been shut down. Work queued against a
    /// torn-down thread is a benign race for callers that treat it as such.
    #[error("dispatcher has been shut down")]
    Disconnected,

    /// The operation must run on the dispatcher's owning thread
    #[error("called from a thread that does not own this dispatcher")]
    WrongThread,

    /// Failed to spawn the dispatcher thread
    #[error("failed to spawn dispatcher thread: {0}")]
    SpawnFailed(String),
}

/// Result type for dispatch operations
pub type Result<T> = std::result::Result<T, DispatchError>;
