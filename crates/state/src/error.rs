//! Error type for the durable state store.

use thiserror::Error;

/// Errors raised while reading, updating or scratching state.
#[derive(Error, Debug)]
pub enum StateError {
    /// An I/O error other than the file simply not existing on `read`.
    #[error("state store I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The state file's JSON did not parse.
    #[error("state file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// `finishEnvSelection` was called while not in the `isEnvSelecting` state.
    #[error("cannot finish environment selection: no selection is in progress")]
    NotSelecting,

    /// The process-local mutex guarding the state file was poisoned by a
    /// panic in another thread holding it.
    #[error("state store mutex poisoned")]
    Poisoned,
}

/// Result alias for state-store operations.
pub type Result<T> = std::result::Result<T, StateError>;
