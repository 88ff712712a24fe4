//! `WorkspaceInterop`: the seam between a resolved workspace/environment
//! pair and its provider, threading state persistence through every call.

use infraglue_model::{Monorepo, ModelError, Plan, ProviderKind};
use infraglue_provider::{provider_for, Inputs, Outputs, ProcessRunner, Provider, ProviderConfig};
use infraglue_state::StateStore;

use crate::error::{EngineError, Result};

/// Outputs fetched for a workspace, tagged with whether they were read
/// live from the provider (`actual = true`) or served from the persisted
/// state cache (`actual = false`).
#[derive(Debug, Clone)]
pub struct FetchedOutputs {
    pub outputs: Outputs,
    pub actual: bool,
}

/// One workspace bound to one environment, ready to drive its provider.
pub struct WorkspaceInterop {
    workspace_name: String,
    env: String,
    cfg: ProviderConfig,
    provider: Box<dyn Provider>,
}

impl WorkspaceInterop {
    /// Construct the interop for `ws_key` in `env`. Fails hard if the
    /// workspace is unknown, undeclared for `env`, or has no resolved
    /// provider.
    pub fn new(monorepo: &Monorepo, ws_key: &str, env: &str) -> Result<Self> {
        let workspace = monorepo.require_workspace(ws_key)?;

        if !workspace.has_env(env) {
            return Err(EngineError::from(ModelError::EnvNotDeclared {
                workspace: workspace.name.clone(),
                env: env.to_string(),
            }));
        }

        let kind: ProviderKind = workspace
            .provider
            .ok_or_else(|| EngineError::internal(format!("workspace {} has no resolved provider", workspace.name)))?;

        let cfg = ProviderConfig::from_workspace(workspace, monorepo.root(), kind);

        Ok(Self { workspace_name: workspace.name.clone(), env: env.to_string(), cfg, provider: provider_for(kind) })
    }

    #[must_use]
    pub fn workspace_name(&self) -> &str {
        &self.workspace_name
    }

    #[must_use]
    pub fn config(&self) -> &ProviderConfig {
        &self.cfg
    }

    /// Clear persisted outputs for this workspace, then run provider
    /// init/select.
    pub async fn select_environment(&self, runner: &dyn ProcessRunner, store: &StateStore) -> Result<()> {
        let name = self.workspace_name.clone();
        store.update(|mut state| {
            state.clear_workspace_outputs(&name);
            Ok(state)
        })?;

        self.provider.select_environment(&self.cfg, runner, store, &self.env).await?;
        Ok(())
    }

    /// Fetch outputs: `stale` consults the persisted cache first; on a
    /// cache miss, or when not stale, fetches live and persists the result.
    pub async fn get_outputs(
        &self,
        runner: &dyn ProcessRunner,
        store: &StateStore,
        stale: bool,
    ) -> Result<FetchedOutputs> {
        if stale {
            let cached = store.read()?.workspace_outputs(&self.workspace_name).cloned();
            if let Some(outputs) = cached {
                return Ok(FetchedOutputs { outputs, actual: false });
            }
        }

        let outputs = self.provider.get_outputs(&self.cfg, runner, &self.env).await?;
        self.persist_outputs(store, outputs.clone())?;
        Ok(FetchedOutputs { outputs, actual: true })
    }

    pub async fn get_plan(
        &self,
        runner: &dyn ProcessRunner,
        store: &StateStore,
        inputs: &Inputs,
        detailed: bool,
    ) -> Result<Plan> {
        Ok(self.provider.get_plan(&self.cfg, runner, store, inputs, &self.env, detailed).await?)
    }

    pub async fn destroy_plan(&self, runner: &dyn ProcessRunner, store: &StateStore, inputs: &Inputs) -> Result<Plan> {
        Ok(self.provider.destroy_plan(&self.cfg, runner, store, inputs, &self.env).await?)
    }

    pub async fn get_drift_plan(&self, runner: &dyn ProcessRunner, store: &StateStore, inputs: &Inputs) -> Result<Plan> {
        Ok(self.provider.get_drift_plan(&self.cfg, runner, store, inputs, &self.env).await?)
    }

    /// Apply `inputs`, persisting the resulting outputs into state.
    pub async fn apply(&self, runner: &dyn ProcessRunner, store: &StateStore, inputs: &Inputs) -> Result<Outputs> {
        let outputs = self.provider.apply(&self.cfg, runner, store, inputs, &self.env).await?;
        self.persist_outputs(store, outputs.clone())?;
        Ok(outputs)
    }

    pub async fn destroy(&self, runner: &dyn ProcessRunner, store: &StateStore, inputs: &Inputs) -> Result<()> {
        Ok(self.provider.destroy(&self.cfg, runner, store, inputs, &self.env).await?)
    }

    pub async fn is_destroyed(&self, runner: &dyn ProcessRunner) -> Result<bool> {
        Ok(self.provider.is_destroyed(&self.cfg, runner, &self.env).await?)
    }

    pub async fn refresh(&self, runner: &dyn ProcessRunner, store: &StateStore, inputs: &Inputs) -> Result<()> {
        self.provider.refresh(&self.cfg, runner, store, inputs, &self.env).await?;
        Ok(())
    }

    pub async fn import_resource(
        &self,
        runner: &dyn ProcessRunner,
        args: &[String],
        inputs: &Inputs,
    ) -> Result<String> {
        Ok(self.provider.import_resource(&self.cfg, runner, args, inputs, &self.env).await?)
    }

    pub async fn generate_code(&self, runner: &dyn ProcessRunner, args: &[String], inputs: &Inputs) -> Result<String> {
        Ok(self.provider.generate_code(&self.cfg, runner, args, inputs, &self.env).await?)
    }

    pub async fn exec_any_command(
        &self,
        runner: &dyn ProcessRunner,
        command: &[String],
        inputs: &Inputs,
    ) -> Result<infraglue_provider::ProcessOutput> {
        Ok(self.provider.exec_any_command(&self.cfg, runner, command, inputs, &self.env).await?)
    }

    fn persist_outputs(&self, store: &StateStore, outputs: Outputs) -> Result<()> {
        let name = self.workspace_name.clone();
        store.update(move |mut state| {
            state.set_workspace_outputs(name, outputs);
            Ok(state)
        })?;
        Ok(())
    }
}
