//! The `Workspace` type: identity, capability, wiring and environments.

use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::environment::EnvironmentConfig;

/// Which external provisioning tool governs a workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// HashiCorp Terraform.
    Terraform,
    /// Pulumi.
    Pulumi,
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderKind::Terraform => write!(f, "terraform"),
            ProviderKind::Pulumi => write!(f, "pulumi"),
        }
    }
}

/// One side of a declared injection: `localKey -> {workspaceKey, outputKey}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InjectionSource {
    /// The key (name or absolute path) of the workspace producing the output.
    pub workspace: String,
    /// The output key to read from that workspace.
    pub key: String,
}

/// A single independently-managed infrastructure unit inside a monorepo.
#[derive(Debug, Clone)]
pub struct Workspace {
    /// Alias if set, else the path relative to the monorepo root.
    pub name: String,
    /// Absolute path to the workspace directory.
    pub absolute_path: PathBuf,
    /// Path relative to the monorepo root (used for injection/exports grammar).
    pub monorepo_path: String,
    /// The provider governing this workspace, if one could be resolved.
    pub provider: Option<ProviderKind>,
    /// `localKey -> {workspaceKey, outputKey}`.
    pub injections: HashMap<String, InjectionSource>,
    /// Explicit `depends_on` entries, in declaration order, as workspace keys.
    pub depends_on: Vec<String>,
    /// Declared environments.
    pub envs: HashMap<String, EnvironmentConfig>,
}

impl Workspace {
    /// Every workspace key this one depends on: the deduplicated union of
    /// injection sources and explicit `depends_on`, injection order first
    /// then any remaining `depends_on` entries, each key appearing once.
    #[must_use]
    pub fn all_depends_on(&self) -> Vec<String> {
        let mut seen = std::collections::HashSet::new();
        let mut out = Vec::new();

        for source in self.injections.values() {
            if seen.insert(source.workspace.clone()) {
                out.push(source.workspace.clone());
            }
        }
        for dep in &self.depends_on {
            if seen.insert(dep.clone()) {
                out.push(dep.clone());
            }
        }
        out
    }

    /// Whether this workspace declares the given environment.
    #[must_use]
    pub fn has_env(&self, env: &str) -> bool {
        self.envs.contains_key(env)
    }

    /// Whether `key` addresses this workspace, by name or absolute path.
    #[must_use]
    pub fn matches_key(&self, key: &str) -> bool {
        self.name == key || self.absolute_path.to_string_lossy() == key
    }
}

/// `ig.yaml` raw document shape for a single workspace, prior to resolving
/// providers/injections/depends_on into the typed [`Workspace`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkspaceDocument {
    /// Explicit provider name (`terraform` | `pulumi`).
    #[serde(default)]
    pub provider: Option<String>,
    /// Alias used as the workspace's public name.
    #[serde(default)]
    pub alias: Option<String>,
    /// `localKey -> "<wsPathOrName>:<outputKey>"`.
    #[serde(default)]
    pub injection: HashMap<String, String>,
    /// Raw `depends_on` entries, resolved relative to this workspace's directory.
    #[serde(default, rename = "depends_on")]
    pub depends_on: Vec<String>,
    /// Declared environments.
    #[serde(default)]
    pub envs: HashMap<String, EnvironmentConfig>,
}
