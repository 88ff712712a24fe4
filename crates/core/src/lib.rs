#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]
#![deny(clippy::todo)]
#![deny(clippy::panic)]

//! # infraglue-core
//!
//! The orchestration core: `WorkspaceInterop` (the seam between a
//! workspace/environment pair and its provider), the `EnvironmentManager`
//! two-phase selection state machine, and the multistage executor driving
//! `exec`/`plan`/`drift`/`refresh_state`.

mod confirmation;
mod diff;
mod environment;
mod error;
mod executor;
mod interop;

pub use confirmation::{AutoApprove, Confirmation, NonInteractive};
pub use diff::{compute_detailed_diff, DetailedDiff};
pub use environment::EnvironmentManager;
pub use error::{EngineError, Result};
pub use executor::{
    drift, exec, executor_config_with_concurrency, plan, refresh_state, DriftReport, DriftSection, ExecOutcome,
    ExecutorConfig, PlanOutcome, PlannedWorkspace, WorkspaceDriftReport,
};
pub use interop::{FetchedOutputs, WorkspaceInterop};
