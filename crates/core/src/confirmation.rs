//! The confirmation collaborator the executor asks before applying a level.
//!
//! Two shapes behind one interface: interactive collaborators return a
//! yes/no answer; non-interactive ones never answer, they only have the
//! side effect of printing a deferred-approval message. The executor
//! branches on a single `is_interactive` flag rather than matching on a
//! concrete type.

use async_trait::async_trait;

/// Asks whether to proceed with applying one execution level.
#[async_trait]
pub trait Confirmation: Send + Sync {
    /// Whether this collaborator can return an answer at all.
    fn is_interactive(&self) -> bool;

    /// Ask `message` and return the user's answer. Only called when
    /// [`Confirmation::is_interactive`] is `true`.
    async fn ask(&self, message: &str) -> bool;

    /// Record that approval for `message` is deferred to a future
    /// invocation with `--approve <level>`. Only called when
    /// [`Confirmation::is_interactive`] is `false`.
    async fn defer(&self, message: &str);
}

/// Always answers yes; used in tests and non-interactive automation that
/// has already decided to proceed via `--approve`.
#[derive(Debug, Default, Clone, Copy)]
pub struct AutoApprove;

#[async_trait]
impl Confirmation for AutoApprove {
    fn is_interactive(&self) -> bool {
        true
    }

    async fn ask(&self, _message: &str) -> bool {
        true
    }

    async fn defer(&self, _message: &str) {}
}

/// Never answers; every level requires a fresh `--approve <level>` run.
#[derive(Debug, Default, Clone, Copy)]
pub struct NonInteractive;

#[async_trait]
impl Confirmation for NonInteractive {
    fn is_interactive(&self) -> bool {
        false
    }

    async fn ask(&self, _message: &str) -> bool {
        false
    }

    async fn defer(&self, message: &str) {
        log::info!("{message}");
    }
}
