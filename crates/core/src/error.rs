//! The engine's aggregate error type and exit-code taxonomy.

use thiserror::Error;

/// Every error the engine can surface, tagged with the exit-code hint a
/// CLI front-end should use.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Invalid input or missing precondition the user must fix.
    #[error("{0}")]
    User(String),

    /// A provisioning tool invocation failed.
    #[error(transparent)]
    Provider(#[from] infraglue_provider::ProviderError),

    /// Configuration parse/validation error, carrying a file path.
    #[error(transparent)]
    Config(#[from] infraglue_config::ConfigError),

    /// The monorepo/workspace/plan data model rejected an operation.
    #[error(transparent)]
    Model(#[from] infraglue_model::ModelError),

    /// The durable state store failed.
    #[error(transparent)]
    State(#[from] infraglue_state::StateError),

    /// An invariant the engine assumes held was violated.
    #[error("internal error: {0}")]
    Internal(String),
}

impl EngineError {
    /// A precondition/input error the user must fix.
    #[must_use]
    pub fn user(message: impl Into<String>) -> Self {
        Self::User(message.into())
    }

    /// An unexpected invariant violation (cycle with an empty path,
    /// missing entry in a graph the caller assumed was complete).
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// The process exit-code hint for this error kind.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            EngineError::User(_) | EngineError::Config(_) => 2,
            EngineError::Provider(_) => 3,
            EngineError::Internal(_) => 1,
            EngineError::Model(_) | EngineError::State(_) => 1,
        }
    }
}

/// Result alias for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;
