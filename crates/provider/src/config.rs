//! `ProviderConfig`: the view of a workspace a provider adapter needs.

use std::collections::HashMap;
use std::path::PathBuf;

use infraglue_model::{EnvironmentConfig, InjectionSource, ProviderKind, Workspace};

/// Everything a provider adapter needs to act on one workspace, independent
/// of the rest of the monorepo graph.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub root_monorepo_folder: PathBuf,
    pub root_path: PathBuf,
    pub alias: String,
    pub provider: ProviderKind,
    pub injections: HashMap<String, InjectionSource>,
    pub depends_on: Vec<String>,
    pub envs: HashMap<String, EnvironmentConfig>,
}

impl ProviderConfig {
    /// Build from a resolved workspace. Panics-by-contract on a workspace
    /// with no provider is avoided by callers: this is only reached once a
    /// provider has been resolved at load time.
    #[must_use]
    pub fn from_workspace(workspace: &Workspace, monorepo_root: impl Into<PathBuf>, provider: ProviderKind) -> Self {
        Self {
            root_monorepo_folder: monorepo_root.into(),
            root_path: workspace.absolute_path.clone(),
            alias: workspace.name.clone(),
            provider,
            injections: workspace.injections.clone(),
            depends_on: workspace.depends_on.clone(),
            envs: workspace.envs.clone(),
        }
    }

    /// The declared environment config for `env`, if any.
    #[must_use]
    pub fn env(&self, env: &str) -> Option<&EnvironmentConfig> {
        self.envs.get(env)
    }
}
