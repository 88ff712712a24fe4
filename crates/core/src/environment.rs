//! `EnvironmentManager` (C7): the two-phase environment-selection state
//! machine layered over the durable state store.

use infraglue_model::Monorepo;
use infraglue_provider::ProcessRunner;
use infraglue_state::StateStore;

use crate::error::{EngineError, Result};
use crate::interop::WorkspaceInterop;

/// Drives environment selection for every workspace that declares `env`.
pub struct EnvironmentManager<'a> {
    monorepo: &'a Monorepo,
}

impl<'a> EnvironmentManager<'a> {
    #[must_use]
    pub fn new(monorepo: &'a Monorepo) -> Self {
        Self { monorepo }
    }

    /// Select `env` across every workspace that declares it. Idempotent:
    /// if `env` is already selected and every affected workspace is
    /// stamped with it, this is a no-op.
    pub async fn select_env(&self, runner: &dyn ProcessRunner, store: &StateStore, env: &str) -> Result<()> {
        let affected: Vec<String> =
            self.monorepo.workspaces().iter().filter(|w| w.has_env(env)).map(|w| w.name.clone()).collect();

        let current = store.read()?;
        let already_selected = current.is_env_selected()
            && current.current_environment.as_deref() == Some(env)
            && affected.iter().all(|name| current.workspace_env(name) == Some(env));

        if already_selected {
            return Ok(());
        }

        let env_owned = env.to_string();
        store.update(|state| Ok(state.start_selecting_env(env_owned)))?;

        for name in &affected {
            let interop = WorkspaceInterop::new(self.monorepo, name, env)?;
            interop.select_environment(runner, store).await?;
        }

        let affected_for_finish = affected.clone();
        store.update(move |state| state.finish_env_selection(&affected_for_finish))?;

        Ok(())
    }

    /// The currently selected environment, or a user error if none is
    /// selected (or a selection is mid-flight).
    pub fn selected_env(&self, store: &StateStore) -> Result<String> {
        let state = store.read()?;
        if !state.is_env_selected() {
            return Err(EngineError::user("No environment selected"));
        }
        state
            .current_environment
            .clone()
            .ok_or_else(|| EngineError::internal("isEnvSelected true but current_environment is absent"))
    }
}
