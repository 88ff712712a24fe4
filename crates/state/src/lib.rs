#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]
#![deny(clippy::todo)]
#![deny(clippy::panic)]

//! # infraglue-state
//!
//! The durable `state.json` document and the [`StateStore`] that guards
//! reads, read-modify-writes and scratch-file staging against it.

mod error;
mod state;
mod store;

pub use error::{Result, StateError};
pub use state::{State, WorkspaceState};
pub use store::StateStore;
