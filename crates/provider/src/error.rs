//! Error type carried by every provider operation.

use thiserror::Error;

/// A failed provider operation, preserving enough of the underlying
/// subprocess invocation for diagnosis.
#[derive(Error, Debug)]
#[error("provider {provider} failed for workspace {workspace}: {message}")]
pub struct ProviderError {
    /// The provider tag (`"terraform"` or `"pulumi"`).
    pub provider: String,
    /// The workspace name the operation was running against.
    pub workspace: String,
    /// Human-readable summary.
    pub message: String,
    /// The command line that was run, if the failure happened after spawn.
    pub command: Option<String>,
    /// The process exit code, if it ran to completion.
    pub exit_code: Option<i32>,
    /// Captured stderr.
    pub stderr: String,
    /// Captured stdout.
    pub stdout: String,
}

impl ProviderError {
    /// Build an error for a command that ran but exited non-zero or whose
    /// output failed to parse.
    #[must_use]
    pub fn command_failed(
        provider: impl Into<String>,
        workspace: impl Into<String>,
        message: impl Into<String>,
        command: impl Into<String>,
        exit_code: Option<i32>,
        stderr: impl Into<String>,
        stdout: impl Into<String>,
    ) -> Self {
        Self {
            provider: provider.into(),
            workspace: workspace.into(),
            message: message.into(),
            command: Some(command.into()),
            exit_code,
            stderr: stderr.into(),
            stdout: stdout.into(),
        }
    }

    /// Build an error for a failure that happened before any subprocess ran
    /// (detection, backend-file setup, missing tool).
    #[must_use]
    pub fn setup(provider: impl Into<String>, workspace: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            workspace: workspace.into(),
            message: message.into(),
            command: None,
            exit_code: None,
            stderr: String::new(),
            stdout: String::new(),
        }
    }
}

/// Result alias for provider operations.
pub type Result<T> = std::result::Result<T, ProviderError>;
