//! The `Monorepo` type: root directory, owned workspaces, exports.

use std::path::{Path, PathBuf};

use crate::error::{ModelError, Result};
use crate::workspace::Workspace;
use infraglue_graph::{level, GraphError};

/// A named output re-exported at the monorepo level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Export {
    /// The export's public name.
    pub name: String,
    /// The workspace key the value comes from.
    pub workspace_key: String,
    /// The output key on that workspace.
    pub output_key: String,
}

/// The root directory declaring one or more workspaces.
///
/// Owns its workspaces for the lifetime of the value; immutable once built.
#[derive(Debug, Clone)]
pub struct Monorepo {
    root: PathBuf,
    workspaces: Vec<Workspace>,
    exports: Vec<Export>,
}

impl Monorepo {
    /// Build a monorepo from its root, workspaces (in declaration order)
    /// and exports.
    #[must_use]
    pub fn new(root: PathBuf, workspaces: Vec<Workspace>, exports: Vec<Export>) -> Self {
        Self { root, workspaces, exports }
    }

    /// The monorepo's root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// All workspaces, in declaration order.
    #[must_use]
    pub fn workspaces(&self) -> &[Workspace] {
        &self.workspaces
    }

    /// Monorepo-level exports.
    #[must_use]
    pub fn exports(&self) -> &[Export] {
        &self.exports
    }

    /// Find a workspace by name or absolute path.
    #[must_use]
    pub fn find_workspace(&self, key: &str) -> Option<&Workspace> {
        self.workspaces.iter().find(|w| w.matches_key(key))
    }

    /// Find a workspace, erroring with [`ModelError::WorkspaceNotFound`].
    pub fn require_workspace(&self, key: &str) -> Result<&Workspace> {
        self.find_workspace(key).ok_or_else(|| ModelError::WorkspaceNotFound(key.to_string()))
    }

    /// Every workspace reachable from `key` over `all_depends_on`, each
    /// appearing exactly once, never including `key` itself.
    pub fn get_transitive_dependencies(&self, key: &str) -> Result<Vec<String>> {
        let root = self.require_workspace(key)?;
        let mut seen = std::collections::HashSet::new();
        let mut out = Vec::new();
        let mut stack: Vec<String> = root.all_depends_on();

        while let Some(dep_key) = stack.pop() {
            if dep_key == key || !seen.insert(dep_key.clone()) {
                continue;
            }
            out.push(dep_key.clone());
            if let Some(ws) = self.find_workspace(&dep_key) {
                for next in ws.all_depends_on() {
                    if next != key && !seen.contains(&next) {
                        stack.push(next);
                    }
                }
            }
        }

        Ok(out)
    }

    /// Level a subset of workspace keys using `edge_fn` to derive edges.
    ///
    /// `edge_fn(key)` returns the keys `key` has an edge *to* (its
    /// dependencies, unless the caller passes dependants for destroy mode).
    pub fn level_keys<F>(&self, keys: &[String], edge_fn: F) -> Result<Vec<Vec<String>>>
    where
        F: Fn(&str) -> Vec<String>,
    {
        level(keys, |k| edge_fn(k)).map_err(|e: GraphError<String>| ModelError::Graph(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workspace::ProviderKind;
    use std::collections::HashMap;

    fn ws(name: &str, depends_on: Vec<&str>) -> Workspace {
        Workspace {
            name: name.to_string(),
            absolute_path: PathBuf::from(format!("/repo/{name}")),
            monorepo_path: name.to_string(),
            provider: Some(ProviderKind::Terraform),
            injections: HashMap::new(),
            depends_on: depends_on.into_iter().map(str::to_string).collect(),
            envs: HashMap::new(),
        }
    }

    #[test]
    fn transitive_dependencies_never_include_self() {
        let mono = Monorepo::new(
            PathBuf::from("/repo"),
            vec![ws("a", vec![]), ws("b", vec!["a"]), ws("c", vec!["b"])],
            vec![],
        );
        let deps = mono.get_transitive_dependencies("c").expect("ok");
        assert!(deps.contains(&"a".to_string()));
        assert!(deps.contains(&"b".to_string()));
        assert!(!deps.contains(&"c".to_string()));
    }
}
