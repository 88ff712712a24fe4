//! Per-invocation execution context: the scratch cache of resolved outputs.

use std::collections::HashMap;
use std::sync::Arc;

use crate::monorepo::Monorepo;

/// A workspace's outputs as seen at some point during the current run.
///
/// At most one entry per `workspace_name` lives in an
/// [`ExecutionContext`]; re-caching a workspace replaces its entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedWorkspace {
    /// The workspace this entry is for.
    pub workspace_name: String,
    /// Flat string outputs, as produced by the provider.
    pub outputs: HashMap<String, String>,
}

/// Mutable per-invocation state: which workspace the caller filtered on,
/// whether dependencies/destroy mode are active, and the scratch cache of
/// outputs resolved or produced so far in this run.
///
/// One `ExecutionContext` is created per CLI invocation and discarded
/// afterwards; it never outlives the operation it was built for.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    /// The monorepo this context operates over.
    pub monorepo: Arc<Monorepo>,
    /// Optional project filter: only this workspace and (unless
    /// `ignore_dependencies`) its transitive dependencies are in scope.
    pub current_workspace: Option<String>,
    /// Skip dependency wiring: plan/apply only the current workspace, and
    /// resolve its injections from persisted state rather than live outputs.
    pub ignore_dependencies: bool,
    /// Whether this invocation is a destroy (dependants torn down first).
    pub is_destroy: bool,
    /// The selected environment this invocation runs against.
    pub env: String,
    workspace_outputs: Vec<AppliedWorkspace>,
}

impl ExecutionContext {
    /// Build a fresh context with an empty outputs cache.
    #[must_use]
    pub fn new(
        monorepo: Arc<Monorepo>,
        current_workspace: Option<String>,
        ignore_dependencies: bool,
        is_destroy: bool,
        env: String,
    ) -> Self {
        Self {
            monorepo,
            current_workspace,
            ignore_dependencies,
            is_destroy,
            env,
            workspace_outputs: Vec::new(),
        }
    }

    /// Look up cached outputs for a workspace, if any were cached this run.
    #[must_use]
    pub fn cached_outputs(&self, workspace_name: &str) -> Option<&HashMap<String, String>> {
        self.workspace_outputs
            .iter()
            .find(|w| w.workspace_name == workspace_name)
            .map(|w| &w.outputs)
    }

    /// Cache (or replace) a workspace's outputs.
    pub fn cache_outputs(&mut self, workspace_name: impl Into<String>, outputs: HashMap<String, String>) {
        let workspace_name = workspace_name.into();
        if let Some(existing) = self.workspace_outputs.iter_mut().find(|w| w.workspace_name == workspace_name) {
            existing.outputs = outputs;
        } else {
            self.workspace_outputs.push(AppliedWorkspace { workspace_name, outputs });
        }
    }

    /// Remove a workspace's cached outputs (called after a successful destroy).
    pub fn store_destroyed_workspace(&mut self, workspace_name: &str) {
        self.workspace_outputs.retain(|w| w.workspace_name != workspace_name);
    }

    /// All cached applied workspaces, in first-cached order.
    #[must_use]
    pub fn applied_workspaces(&self) -> &[AppliedWorkspace] {
        &self.workspace_outputs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn cache_outputs_is_replace_on_write() {
        let mono = Arc::new(Monorepo::new(PathBuf::from("/repo"), vec![], vec![]));
        let mut ctx = ExecutionContext::new(mono, None, false, false, "dev".to_string());

        ctx.cache_outputs("a", HashMap::from([("x".to_string(), "1".to_string())]));
        ctx.cache_outputs("a", HashMap::from([("x".to_string(), "2".to_string())]));

        assert_eq!(ctx.applied_workspaces().len(), 1);
        assert_eq!(ctx.cached_outputs("a").unwrap().get("x"), Some(&"2".to_string()));
    }

    #[test]
    fn store_destroyed_workspace_clears_cache() {
        let mono = Arc::new(Monorepo::new(PathBuf::from("/repo"), vec![], vec![]));
        let mut ctx = ExecutionContext::new(mono, None, false, true, "dev".to_string());
        ctx.cache_outputs("a", HashMap::new());
        ctx.store_destroyed_workspace("a");
        assert!(ctx.cached_outputs("a").is_none());
    }
}
