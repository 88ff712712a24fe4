#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]
#![deny(clippy::todo)]
#![deny(clippy::panic)]

//! # infraglue-provider
//!
//! The [`Provider`] capability trait, the [`ProcessRunner`] subprocess seam,
//! and the Terraform/Pulumi adapters that implement it.

mod config;
mod error;
pub mod process;
mod provider;
pub mod pulumi;
pub mod terraform;

use std::path::Path;

use infraglue_model::ProviderKind;

pub use config::ProviderConfig;
pub use error::{ProviderError, Result};
pub use process::{ProcessOutput, ProcessRequest, ProcessRunner, TokioProcessRunner};
pub use provider::{Inputs, Outputs, Provider};
pub use pulumi::PulumiProvider;
pub use terraform::TerraformProvider;

/// Auto-detect which provider governs a workspace directory, preferring
/// Terraform when a directory ambiguously satisfies both detectors (a
/// `.tf` file alongside a stray `Pulumi.yaml`).
#[must_use]
pub fn detect(dir: &Path) -> Option<ProviderKind> {
    if terraform::detect(dir) {
        Some(ProviderKind::Terraform)
    } else if pulumi::detect(dir) {
        Some(ProviderKind::Pulumi)
    } else {
        None
    }
}

/// Resolve a [`ProviderKind`] to its adapter implementation.
#[must_use]
pub fn provider_for(kind: ProviderKind) -> Box<dyn Provider> {
    match kind {
        ProviderKind::Terraform => Box::new(TerraformProvider),
        ProviderKind::Pulumi => Box::new(PulumiProvider),
    }
}
