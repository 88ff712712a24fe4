//! Error type for the data model.

use thiserror::Error;

/// Errors raised while constructing or querying the model.
#[derive(Error, Debug)]
pub enum ModelError {
    /// A workspace key (name or absolute path) does not resolve.
    #[error("workspace '{0}' not found in monorepo")]
    WorkspaceNotFound(String),

    /// An edge in the effective dependency graph targets a workspace that
    /// does not declare the requested environment.
    #[error("workspace '{workspace}' does not declare environment '{env}'")]
    EnvNotDeclared {
        /// The workspace missing the environment.
        workspace: String,
        /// The environment that was required.
        env: String,
    },

    /// The dependency graph is not a DAG, or named an unknown workspace.
    #[error("graph error: {0}")]
    Graph(String),
}

/// Result alias for model operations.
pub type Result<T> = std::result::Result<T, ModelError>;
