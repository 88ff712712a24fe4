//! The persisted `State` document and its environment-selection machine.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{Result, StateError};

/// Per-workspace slice of persisted state.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct WorkspaceState {
    /// The environment this workspace was last selected into.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub env: Option<String>,
    /// Cached outputs from the last successful fetch or apply.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outputs: Option<HashMap<String, String>>,
}

/// The document persisted at `<root>/.ig/state.json`.
///
/// `isEnvSelected ≡ current_environment set ∧ next_environment absent`.
/// `isEnvSelecting ≡ next_environment set`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct State {
    /// The environment currently selected across every affected workspace.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_environment: Option<String>,
    /// The environment a selection is in progress towards.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_environment: Option<String>,
    /// Per-workspace state, keyed by workspace name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workspaces: Option<HashMap<String, WorkspaceState>>,
}

impl State {
    /// Whether an environment is fully selected (no selection in progress).
    #[must_use]
    pub fn is_env_selected(&self) -> bool {
        self.current_environment.is_some() && self.next_environment.is_none()
    }

    /// Whether a two-phase environment selection is in progress.
    #[must_use]
    pub fn is_env_selecting(&self) -> bool {
        self.next_environment.is_some()
    }

    /// Begin selecting `env`. Idempotent with respect to re-entry: calling
    /// this again before `finish_env_selection` simply overwrites the
    /// pending target.
    #[must_use]
    pub fn start_selecting_env(mut self, env: impl Into<String>) -> Self {
        self.next_environment = Some(env.into());
        self
    }

    /// Complete a selection: `next -> current`, clear `next`, and stamp
    /// `env = current` on every named workspace.
    ///
    /// # Errors
    ///
    /// Returns [`StateError::NotSelecting`] if called while
    /// `is_env_selecting()` is false.
    pub fn finish_env_selection(mut self, affected: &[String]) -> Result<Self> {
        if !self.is_env_selecting() {
            return Err(StateError::NotSelecting);
        }
        let env = self.next_environment.take();
        self.current_environment = env.clone();

        let workspaces = self.workspaces.get_or_insert_with(HashMap::new);
        for name in affected {
            let entry = workspaces.entry(name.clone()).or_default();
            entry.env = env.clone();
        }

        Ok(self)
    }

    /// Outputs persisted for `workspace_name`, if any.
    #[must_use]
    pub fn workspace_outputs(&self, workspace_name: &str) -> Option<&HashMap<String, String>> {
        self.workspaces.as_ref()?.get(workspace_name)?.outputs.as_ref()
    }

    /// The environment `workspace_name` was last stamped with, if any.
    #[must_use]
    pub fn workspace_env(&self, workspace_name: &str) -> Option<&str> {
        self.workspaces.as_ref()?.get(workspace_name)?.env.as_deref()
    }

    /// Persist outputs for `workspace_name`, replacing any previous value.
    pub fn set_workspace_outputs(&mut self, workspace_name: impl Into<String>, outputs: HashMap<String, String>) {
        self.workspaces.get_or_insert_with(HashMap::new).entry(workspace_name.into()).or_default().outputs =
            Some(outputs);
    }

    /// Clear persisted outputs for `workspace_name` (e.g. before
    /// re-selecting its environment, or after a destroy).
    pub fn clear_workspace_outputs(&mut self, workspace_name: &str) {
        if let Some(workspaces) = self.workspaces.as_mut() {
            if let Some(entry) = workspaces.get_mut(workspace_name) {
                entry.outputs = None;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finish_without_start_is_an_error() {
        let state = State::default();
        assert!(matches!(state.finish_env_selection(&[]), Err(StateError::NotSelecting)));
    }

    #[test]
    fn start_then_finish_selects_and_stamps_workspaces() {
        let state = State::default().start_selecting_env("qa");
        assert!(state.is_env_selecting());
        assert!(!state.is_env_selected());

        let state = state.finish_env_selection(&["a".to_string(), "b".to_string()]).expect("ok");
        assert!(state.is_env_selected());
        assert_eq!(state.current_environment.as_deref(), Some("qa"));
        assert_eq!(state.workspaces.as_ref().unwrap()["a"].env.as_deref(), Some("qa"));
        assert_eq!(state.workspaces.as_ref().unwrap()["b"].env.as_deref(), Some("qa"));
    }
}
