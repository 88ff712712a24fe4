#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]
#![deny(clippy::todo)]
#![deny(clippy::panic)]

//! # infraglue-model
//!
//! Types for `Monorepo`, `Workspace`, `ExecutionContext`, `Plan` and the
//! `ExecutionPlanBuilder` that filters and levels workspaces for one
//! orchestration request.

mod context;
mod environment;
mod error;
mod execution_plan;
mod monorepo;
mod plan;
mod workspace;

pub use context::{AppliedWorkspace, ExecutionContext};
pub use environment::EnvironmentConfig;
pub use error::{ModelError, Result};
pub use execution_plan::{ExecutionLevel, ExecutionPlan, ExecutionPlanBuilder};
pub use monorepo::{Export, Monorepo};
pub use plan::{ChangeAction, ChangeSummary, Diagnostic, Output, OutputAction, Plan, ResourceChange};
pub use workspace::{InjectionSource, ProviderKind, Workspace, WorkspaceDocument};
