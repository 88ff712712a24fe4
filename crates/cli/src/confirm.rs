//! The CLI's two `Confirmation` collaborators: an interactive TTY prompt
//! and a deferred, `--approve <level>`-driven non-interactive path.

#![allow(clippy::print_stdout)]

use async_trait::async_trait;
use dialoguer::Confirm;

use infraglue_core::Confirmation;

/// Prompts on stdin/stdout via `dialoguer`. Used when the caller passed
/// neither `--yes` nor `--approve`.
pub struct TtyConfirmation;

#[async_trait]
impl Confirmation for TtyConfirmation {
    fn is_interactive(&self) -> bool {
        true
    }

    async fn ask(&self, message: &str) -> bool {
        println!("{message}");
        Confirm::new().with_prompt("proceed with this level?").default(false).interact().unwrap_or(false)
    }

    async fn defer(&self, _message: &str) {}
}

/// Never answers; every level needs a fresh invocation with
/// `--approve <level>` matching it. Used whenever `--approve` is passed
/// (one level per run) so the executor's deferred-approval message prints
/// and the operation stops without a TTY round-trip.
pub struct DeferConfirmation;

#[async_trait]
impl Confirmation for DeferConfirmation {
    fn is_interactive(&self) -> bool {
        false
    }

    async fn ask(&self, _message: &str) -> bool {
        false
    }

    async fn defer(&self, message: &str) {
        println!("{message}");
        println!("re-run with --approve <level> to apply this level");
    }
}
