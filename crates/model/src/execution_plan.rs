//! `ExecutionPlanBuilder`: filters and levels workspaces for one request.

use std::collections::HashSet;

use crate::context::ExecutionContext;
use crate::error::{ModelError, Result};
use crate::workspace::Workspace;

/// One level of the execution plan: workspaces that may be planned/applied
/// concurrently because none of them depends on another within the level.
#[derive(Debug, Clone, Default)]
pub struct ExecutionLevel {
    /// Workspace keys (absolute paths) in this level, input order preserved.
    pub workspaces: Vec<String>,
}

/// A dependency-respecting, levelled execution order for one request.
#[derive(Debug, Clone, Default)]
pub struct ExecutionPlan {
    /// Levels in execution order: level 0 first.
    pub levels: Vec<ExecutionLevel>,
}

impl ExecutionPlan {
    /// Total number of workspaces across every level.
    #[must_use]
    pub fn workspace_count(&self) -> usize {
        self.levels.iter().map(|l| l.workspaces.len()).sum()
    }
}

fn canonical_key(ws: &Workspace) -> String {
    ws.absolute_path.to_string_lossy().into_owned()
}

/// Builds an [`ExecutionPlan`] from an [`ExecutionContext`], per §4.6:
///
/// 1. candidate set (current workspace + transitive deps, or everything)
/// 2. filter by `has_env`
/// 3. pick the edge function (none / dependencies / dependants for destroy)
/// 4. validate every edge target still has the environment declared
/// 5. level via `infraglue-graph`
pub struct ExecutionPlanBuilder;

impl ExecutionPlanBuilder {
    /// Build the plan. See the module docs for the algorithm.
    pub fn build(ctx: &ExecutionContext) -> Result<ExecutionPlan> {
        let mono = &ctx.monorepo;

        // 1. candidate set, expressed in canonical (absolute-path) keys.
        let candidates: Vec<String> = if let Some(cur) = &ctx.current_workspace {
            let root_ws = mono.require_workspace(cur)?;
            let root_key = canonical_key(root_ws);
            let mut set = vec![root_key.clone()];
            if !ctx.ignore_dependencies {
                for dep_key in mono.get_transitive_dependencies(&root_key)? {
                    if !set.contains(&dep_key) {
                        set.push(dep_key);
                    }
                }
            }
            set
        } else {
            mono.workspaces().iter().map(canonical_key).collect()
        };

        // 2. filter by has_env.
        let retained: Vec<String> = candidates
            .into_iter()
            .filter(|key| mono.find_workspace(key).is_some_and(|w| w.has_env(&ctx.env)))
            .collect();
        let retained_set: HashSet<&str> = retained.iter().map(String::as_str).collect();

        // 3. edge function.
        let edge_fn = |key: &str| -> Vec<String> {
            if ctx.ignore_dependencies {
                Vec::new()
            } else if ctx.is_destroy {
                mono.workspaces()
                    .iter()
                    .filter(|w| retained_set.contains(canonical_key(w).as_str()))
                    .filter(|w| w.all_depends_on().iter().any(|d| d == key))
                    .map(canonical_key)
                    .collect()
            } else {
                mono.find_workspace(key).map(Workspace::all_depends_on).unwrap_or_default()
            }
        };

        // 4. validate: every edge target must still be in the retained set.
        for key in &retained {
            for target in edge_fn(key) {
                if retained_set.contains(target.as_str()) {
                    continue;
                }
                return match mono.find_workspace(&target) {
                    Some(w) => Err(ModelError::EnvNotDeclared { workspace: w.name.clone(), env: ctx.env.clone() }),
                    None => Err(ModelError::WorkspaceNotFound(target)),
                };
            }
        }

        // 5. level.
        let levels = mono.level_keys(&retained, edge_fn)?;
        Ok(ExecutionPlan { levels: levels.into_iter().map(|workspaces| ExecutionLevel { workspaces }).collect() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::EnvironmentConfig;
    use crate::monorepo::Monorepo;
    use crate::workspace::{InjectionSource, ProviderKind};
    use std::collections::HashMap;
    use std::path::PathBuf;
    use std::sync::Arc;

    fn ws(name: &str, depends_on: Vec<&str>, envs: &[&str]) -> Workspace {
        Workspace {
            name: name.to_string(),
            absolute_path: PathBuf::from(format!("/repo/{name}")),
            monorepo_path: name.to_string(),
            provider: Some(ProviderKind::Terraform),
            injections: HashMap::new(),
            depends_on: depends_on.iter().map(|d| format!("/repo/{d}")).collect(),
            envs: envs.iter().map(|e| ((*e).to_string(), EnvironmentConfig::default())).collect(),
        }
    }

    fn ws_with_injection(name: &str, local_key: &str, from_ws: &str, out_key: &str, envs: &[&str]) -> Workspace {
        let mut injections = HashMap::new();
        injections.insert(
            local_key.to_string(),
            InjectionSource { workspace: format!("/repo/{from_ws}"), key: out_key.to_string() },
        );
        Workspace {
            name: name.to_string(),
            absolute_path: PathBuf::from(format!("/repo/{name}")),
            monorepo_path: name.to_string(),
            provider: Some(ProviderKind::Terraform),
            injections,
            depends_on: vec![],
            envs: envs.iter().map(|e| ((*e).to_string(), EnvironmentConfig::default())).collect(),
        }
    }

    #[test]
    fn linear_chain_produces_three_levels() {
        let mono = Arc::new(Monorepo::new(
            PathBuf::from("/repo"),
            vec![
                ws("a", vec![], &["dev"]),
                ws_with_injection("b", "out1", "a", "out1", &["dev"]),
                ws("c", vec!["b"], &["dev"]),
            ],
            vec![],
        ));
        let ctx = ExecutionContext::new(mono, None, false, false, "dev".to_string());
        let plan = ExecutionPlanBuilder::build(&ctx).expect("ok");
        assert_eq!(plan.levels.len(), 3);
        assert_eq!(plan.levels[0].workspaces, vec!["/repo/a".to_string()]);
        assert_eq!(plan.levels[1].workspaces, vec!["/repo/b".to_string()]);
        assert_eq!(plan.levels[2].workspaces, vec!["/repo/c".to_string()]);
    }

    #[test]
    fn destroy_diamond_reverses_order() {
        let mono = Arc::new(Monorepo::new(
            PathBuf::from("/repo"),
            vec![
                ws("a", vec![], &["dev"]),
                ws("b", vec!["a"], &["dev"]),
                ws("c", vec!["a"], &["dev"]),
                ws("d", vec!["b", "c"], &["dev"]),
            ],
            vec![],
        ));
        let ctx = ExecutionContext::new(mono, None, false, true, "dev".to_string());
        let plan = ExecutionPlanBuilder::build(&ctx).expect("ok");
        assert_eq!(plan.levels.len(), 3);
        assert_eq!(plan.levels[0].workspaces, vec!["/repo/d".to_string()]);
        let mut mid = plan.levels[1].workspaces.clone();
        mid.sort();
        assert_eq!(mid, vec!["/repo/b".to_string(), "/repo/c".to_string()]);
        assert_eq!(plan.levels[2].workspaces, vec!["/repo/a".to_string()]);
    }

    #[test]
    fn filter_drops_workspaces_without_env_and_dangling_edge_errors() {
        let mono = Arc::new(Monorepo::new(
            PathBuf::from("/repo"),
            vec![ws("a", vec![], &["prod"]), ws("b", vec!["a"], &["dev"])],
            vec![],
        ));
        let ctx = ExecutionContext::new(mono, None, false, false, "dev".to_string());
        let err = ExecutionPlanBuilder::build(&ctx).unwrap_err();
        match err {
            ModelError::EnvNotDeclared { workspace, env } => {
                assert_eq!(workspace, "a");
                assert_eq!(env, "dev");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn current_workspace_filter_scopes_to_its_dependencies() {
        let mono = Arc::new(Monorepo::new(
            PathBuf::from("/repo"),
            vec![ws("a", vec![], &["dev"]), ws("b", vec!["a"], &["dev"]), ws("unrelated", vec![], &["dev"])],
            vec![],
        ));
        let ctx = ExecutionContext::new(mono, Some("b".to_string()), false, false, "dev".to_string());
        let plan = ExecutionPlanBuilder::build(&ctx).expect("ok");
        assert_eq!(plan.workspace_count(), 2);
    }
}
