//! The `Provider` capability trait every adapter implements.

use std::collections::HashMap;

use async_trait::async_trait;
use infraglue_model::{Plan, ProviderKind};
use infraglue_state::StateStore;

use crate::config::ProviderConfig;
use crate::error::Result;
use crate::process::{ProcessOutput, ProcessRunner};

/// Flat string key/value map; structured values are JSON-encoded strings at
/// this boundary.
pub type Inputs = HashMap<String, String>;

/// Flat string key/value map of provider outputs.
pub type Outputs = HashMap<String, String>;

/// The capability set the orchestration core consumes from a provisioning
/// tool, independent of whether it is Terraform, Pulumi, or something else
/// entirely. Each adapter carries its own parser and command table; no
/// runtime reflection is needed by callers.
#[async_trait]
pub trait Provider: Send + Sync {
    /// The tag identifying this adapter (`terraform`, `pulumi`, …).
    fn name(&self) -> ProviderKind;

    /// Initialise the tool and select/create the target stack or workspace.
    async fn select_environment(
        &self,
        cfg: &ProviderConfig,
        runner: &dyn ProcessRunner,
        store: &StateStore,
        env: &str,
    ) -> Result<()>;

    /// Produce a plan for applying `inputs` against `env`.
    async fn get_plan(
        &self,
        cfg: &ProviderConfig,
        runner: &dyn ProcessRunner,
        store: &StateStore,
        inputs: &Inputs,
        env: &str,
        detailed: bool,
    ) -> Result<Plan>;

    /// Apply `inputs` against `env`, returning the resulting outputs.
    async fn apply(
        &self,
        cfg: &ProviderConfig,
        runner: &dyn ProcessRunner,
        store: &StateStore,
        inputs: &Inputs,
        env: &str,
    ) -> Result<Outputs>;

    /// Fetch live outputs for `env` without applying anything.
    async fn get_outputs(&self, cfg: &ProviderConfig, runner: &dyn ProcessRunner, env: &str) -> Result<Outputs>;

    /// Produce a plan for destroying everything this workspace manages.
    async fn destroy_plan(
        &self,
        cfg: &ProviderConfig,
        runner: &dyn ProcessRunner,
        store: &StateStore,
        inputs: &Inputs,
        env: &str,
    ) -> Result<Plan>;

    /// Destroy everything this workspace manages in `env`.
    async fn destroy(
        &self,
        cfg: &ProviderConfig,
        runner: &dyn ProcessRunner,
        store: &StateStore,
        inputs: &Inputs,
        env: &str,
    ) -> Result<()>;

    /// Whether `env` currently manages zero resources.
    async fn is_destroyed(&self, cfg: &ProviderConfig, runner: &dyn ProcessRunner, env: &str) -> Result<bool>;

    /// A refresh-only preview plan, for drift detection.
    async fn get_drift_plan(
        &self,
        cfg: &ProviderConfig,
        runner: &dyn ProcessRunner,
        store: &StateStore,
        inputs: &Inputs,
        env: &str,
    ) -> Result<Plan>;

    /// Reconcile state with real infrastructure without changing it.
    async fn refresh(
        &self,
        cfg: &ProviderConfig,
        runner: &dyn ProcessRunner,
        store: &StateStore,
        inputs: &Inputs,
        env: &str,
    ) -> Result<()>;

    /// Import an existing resource under management.
    async fn import_resource(
        &self,
        cfg: &ProviderConfig,
        runner: &dyn ProcessRunner,
        args: &[String],
        inputs: &Inputs,
        env: &str,
    ) -> Result<String>;

    /// Generate provider-native code for an existing resource.
    async fn generate_code(
        &self,
        cfg: &ProviderConfig,
        runner: &dyn ProcessRunner,
        args: &[String],
        inputs: &Inputs,
        env: &str,
    ) -> Result<String>;

    /// Escape hatch: run an arbitrary tool subcommand with the workspace's
    /// environment and var/config plumbing already set up.
    async fn exec_any_command(
        &self,
        cfg: &ProviderConfig,
        runner: &dyn ProcessRunner,
        command: &[String],
        inputs: &Inputs,
        env: &str,
    ) -> Result<ProcessOutput>;
}
