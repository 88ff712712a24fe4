//! The Multistage Executor (C8): the scheduler loop behind `exec`, `plan`,
//! `drift` and `refresh_state`. Level-gather-confirm-apply, generalising the
//! teacher's sequential `ParallelExecutor` into genuinely concurrent
//! apply-phase fan-out via `tokio::task::JoinSet`.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use infraglue_model::{ExecutionContext, ExecutionPlanBuilder, Monorepo, Plan, ProviderKind, Workspace};
use infraglue_provider::{Inputs, Outputs, ProcessRunner};
use infraglue_state::StateStore;

use crate::confirmation::Confirmation;
use crate::error::{EngineError, Result};
use crate::interop::WorkspaceInterop;

/// Caps how many workspaces of one level apply concurrently.
#[derive(Debug, Clone, Copy)]
pub struct ExecutorConfig {
    /// Maximum number of concurrent applies per level.
    pub max_parallel: usize,
}

impl Default for ExecutorConfig {
    /// Defaults `max_parallel` to the number of CPU cores, matching the
    /// teacher's `ParallelExecutionConfig::default()`.
    fn default() -> Self {
        Self { max_parallel: num_cpus::get().max(1) }
    }
}

/// An `ExecutorConfig` with a caller-chosen concurrency cap.
#[must_use]
pub fn executor_config_with_concurrency(max_parallel: usize) -> ExecutorConfig {
    ExecutorConfig { max_parallel: max_parallel.max(1) }
}

fn ws_key(ws: &Workspace) -> String {
    ws.absolute_path.to_string_lossy().into_owned()
}

fn validate_env(state: &infraglue_state::State, env: &str) -> Result<()> {
    if !state.is_env_selected() {
        return Err(EngineError::user("no environment selected; run `select-env` first"));
    }
    if state.current_environment.as_deref() != Some(env) {
        return Err(EngineError::user(format!(
            "environment mismatch: state has {:?} selected, this operation targets {env:?}",
            state.current_environment
        )));
    }
    Ok(())
}

/// Resolve one workspace's injected inputs, per the §4.8 preamble: prefer
/// the context's output cache, falling back to a live/stale fetch that
/// back-fills the cache when the fetch was live.
async fn resolve_inputs(
    monorepo: &Monorepo,
    ctx: &mut ExecutionContext,
    runner: &dyn ProcessRunner,
    store: &StateStore,
    ws: &Workspace,
) -> Result<Inputs> {
    let mut inputs = Inputs::new();

    for (local_key, source) in &ws.injections {
        let source_ws = monorepo.require_workspace(&source.workspace)?;
        let source_key = ws_key(source_ws);

        let value = if let Some(cached) = ctx.cached_outputs(&source_key) {
            cached.get(&source.key).cloned()
        } else {
            let interop = WorkspaceInterop::new(monorepo, &source_key, &ctx.env)?;
            let fetched = interop.get_outputs(runner, store, ctx.ignore_dependencies).await?;
            if fetched.actual {
                ctx.cache_outputs(source_key.clone(), fetched.outputs.clone());
            }
            fetched.outputs.get(&source.key).cloned()
        };

        let value = value.ok_or_else(|| {
            EngineError::user(format!(
                "workspace {} injects undefined output {:?} from {}",
                ws.name, source.key, source_ws.name
            ))
        })?;

        inputs.insert(local_key.clone(), value);
    }

    Ok(inputs)
}

/// One workspace retained past the gather phase, awaiting confirmation/apply.
struct GatheredEntry {
    workspace_key: String,
    workspace_name: String,
    inputs: Inputs,
    plan: Plan,
}

/// Gather one level's plans, sequentially per workspace (so the confirmation
/// message is deterministic). Shared by `exec` and `plan`.
async fn gather_level(
    monorepo: &Monorepo,
    ctx: &mut ExecutionContext,
    runner: &dyn ProcessRunner,
    store: &StateStore,
    level_keys: &[String],
    detailed: bool,
) -> Result<Vec<GatheredEntry>> {
    let mut gathered = Vec::new();

    for key in level_keys {
        let ws = monorepo.require_workspace(key)?;
        let inputs = resolve_inputs(monorepo, ctx, runner, store, ws).await?;
        let interop = WorkspaceInterop::new(monorepo, key, &ctx.env)?;

        if ctx.is_destroy {
            if interop.is_destroyed(runner).await? {
                continue;
            }
            let plan = interop.destroy_plan(runner, store, &inputs).await?;
            if !plan.has_changes() {
                continue;
            }
            gathered.push(GatheredEntry { workspace_key: key.clone(), workspace_name: ws.name.clone(), inputs, plan });
        } else {
            let plan = interop.get_plan(runner, store, &inputs, detailed).await?;
            if !plan.has_changes() {
                let fetched = interop.get_outputs(runner, store, ctx.ignore_dependencies).await?;
                ctx.cache_outputs(key.clone(), fetched.outputs);
                continue;
            }
            gathered.push(GatheredEntry { workspace_key: key.clone(), workspace_name: ws.name.clone(), inputs, plan });
        }
    }

    Ok(gathered)
}

fn render_level_summary(level_index: usize, is_destroy: bool, gathered: &[GatheredEntry]) -> String {
    let verb = if is_destroy { "destroy" } else { "apply" };
    let mut lines = vec![format!("level {} ({verb}): {} workspace(s)", level_index + 1, gathered.len())];
    for entry in gathered {
        let s = &entry.plan.change_summary;
        lines.push(format!(
            "  {} ({}): +{} ~{} -{} ±{} outputs:{}",
            entry.workspace_name, entry.plan.provider, s.add, s.change, s.remove, s.replace, s.output_updates
        ));
    }
    lines.join("\n")
}

/// Apply (or destroy) every retained workspace of one level concurrently,
/// capped at `config.max_parallel`, folding results back into `ctx`.
///
/// A failure in one workspace does not cancel its already-finished
/// siblings; it is still surfaced once every task of the level has settled.
async fn apply_level(
    monorepo: &Monorepo,
    ctx: &mut ExecutionContext,
    runner: &Arc<dyn ProcessRunner>,
    store: &Arc<StateStore>,
    gathered: Vec<GatheredEntry>,
    config: ExecutorConfig,
) -> Result<()> {
    let is_destroy = ctx.is_destroy;
    let env = ctx.env.clone();
    let semaphore = Arc::new(Semaphore::new(config.max_parallel));

    let mut set: JoinSet<(String, Result<Option<Outputs>>)> = JoinSet::new();

    for entry in gathered {
        let interop = Arc::new(WorkspaceInterop::new(monorepo, &entry.workspace_key, &env)?);
        let runner = Arc::clone(runner);
        let store = Arc::clone(store);
        let semaphore = Arc::clone(&semaphore);
        let key = entry.workspace_key;
        let inputs = entry.inputs;

        set.spawn(async move {
            let _permit = semaphore.acquire_owned().await;
            let result = if is_destroy {
                interop.destroy(runner.as_ref(), store.as_ref(), &inputs).await.map(|()| None)
            } else {
                interop.apply(runner.as_ref(), store.as_ref(), &inputs).await.map(Some)
            };
            (key, result)
        });
    }

    let mut first_err = None;
    while let Some(joined) = set.join_next().await {
        let (key, result) = joined.map_err(|e| EngineError::internal(format!("apply task panicked: {e}")))?;
        match result {
            Ok(Some(outputs)) => ctx.cache_outputs(key, outputs),
            Ok(None) => ctx.store_destroyed_workspace(&key),
            Err(err) if first_err.is_none() => first_err = Some(err),
            Err(_) => {}
        }
    }

    match first_err {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

fn compute_exports(monorepo: &Monorepo, ctx: &ExecutionContext) -> HashMap<String, String> {
    let mut exports = HashMap::new();

    for export in monorepo.exports() {
        let Some(ws) = monorepo.find_workspace(&export.workspace_key) else {
            log::warn!("export {} references unknown workspace {}", export.name, export.workspace_key);
            continue;
        };

        let value = ctx.cached_outputs(&ws_key(ws)).and_then(|outs| outs.get(&export.output_key));
        match value {
            Some(value) => {
                exports.insert(export.name.clone(), value.clone());
            }
            None => log::warn!(
                "export {} references {}:{} which was not produced this run",
                export.name,
                export.workspace_key,
                export.output_key
            ),
        }
    }

    exports
}

/// The result of an `exec` invocation.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ExecOutcome {
    /// How many levels actually ran their apply phase (fewer than the full
    /// plan if confirmation stopped the operation early).
    pub levels_applied: usize,
    /// Total levels in the plan.
    pub levels_total: usize,
    /// Monorepo-level exports resolved after a non-destroy, whole-monorepo run.
    pub exports: HashMap<String, String>,
}

/// `exec`: the apply/destroy main loop (§4.8.1).
pub async fn exec(
    ctx: &mut ExecutionContext,
    runner: Arc<dyn ProcessRunner>,
    store: Arc<StateStore>,
    confirmation: &dyn Confirmation,
    approve: Option<usize>,
    config: ExecutorConfig,
) -> Result<ExecOutcome> {
    validate_env(&store.read()?, &ctx.env)?;

    let monorepo = Arc::clone(&ctx.monorepo);
    let execution_plan = ExecutionPlanBuilder::build(ctx)?;
    let levels_total = execution_plan.levels.len();

    for (level_index, level) in execution_plan.levels.iter().enumerate() {
        let gathered = gather_level(&monorepo, ctx, runner.as_ref(), store.as_ref(), &level.workspaces, false).await?;
        if gathered.is_empty() {
            continue;
        }

        let message = render_level_summary(level_index, ctx.is_destroy, &gathered);

        let proceed = if !confirmation.is_interactive() && approve == Some(level_index + 1) {
            true
        } else if confirmation.is_interactive() {
            confirmation.ask(&message).await
        } else {
            confirmation.defer(&message).await;
            false
        };

        if !proceed {
            return Ok(ExecOutcome { levels_applied: level_index, levels_total, exports: HashMap::new() });
        }

        apply_level(&monorepo, ctx, &runner, &store, gathered, config).await?;
    }

    let exports = if !ctx.is_destroy && ctx.current_workspace.is_none() {
        compute_exports(&monorepo, ctx)
    } else {
        HashMap::new()
    };

    Ok(ExecOutcome { levels_applied: levels_total, levels_total, exports })
}

/// One workspace's plan as surfaced by [`plan`].
#[derive(Debug, Clone, serde::Serialize)]
pub struct PlannedWorkspace {
    /// The workspace's display name.
    pub workspace_name: String,
    /// The workspace's canonical key (absolute path).
    pub workspace_key: String,
    /// The provider's plan for this workspace.
    pub plan: Plan,
}

/// The result of a `plan` invocation.
#[derive(Debug, Clone, serde::Serialize)]
pub struct PlanOutcome {
    /// Whether any workspace in any level had changes.
    pub has_changes: bool,
    /// Retained workspaces, grouped by level, in execution order.
    pub levels: Vec<Vec<PlannedWorkspace>>,
}

/// `plan`: same gather logic as `exec`, never confirms or applies (§4.8.2).
pub async fn plan(
    ctx: &mut ExecutionContext,
    runner: &dyn ProcessRunner,
    store: &StateStore,
    detailed: bool,
) -> Result<PlanOutcome> {
    validate_env(&store.read()?, &ctx.env)?;

    let monorepo = Arc::clone(&ctx.monorepo);
    let execution_plan = ExecutionPlanBuilder::build(ctx)?;

    let mut has_changes = false;
    let mut levels = Vec::with_capacity(execution_plan.levels.len());

    for level in &execution_plan.levels {
        let gathered = gather_level(&monorepo, ctx, runner, store, &level.workspaces, detailed).await?;
        has_changes |= !gathered.is_empty();
        levels.push(
            gathered
                .into_iter()
                .map(|e| PlannedWorkspace { workspace_name: e.workspace_name, workspace_key: e.workspace_key, plan: e.plan })
                .collect(),
        );
    }

    Ok(PlanOutcome { has_changes, levels })
}

/// One side (infrastructure or configuration) of a workspace's drift report.
#[derive(Debug, Clone, serde::Serialize)]
pub struct DriftSection {
    /// Whether this side has any drift.
    pub has_drift: bool,
    /// The underlying plan, absent when this side wasn't evaluated.
    pub plan: Option<Plan>,
}

/// One workspace's drift report.
#[derive(Debug, Clone, serde::Serialize)]
pub struct WorkspaceDriftReport {
    /// The workspace's display name.
    pub name: String,
    /// The workspace's provider.
    pub provider: ProviderKind,
    /// Whether either side drifted.
    pub has_drift: bool,
    /// Drift between live infrastructure and the provider's recorded state.
    pub infrastructure_drift: DriftSection,
    /// Drift between the provider's recorded state and the checked-in configuration.
    pub configuration_drift: DriftSection,
}

/// The result of a `drift` invocation.
#[derive(Debug, Clone, serde::Serialize)]
pub struct DriftReport {
    /// The environment this report was taken against.
    pub environment: String,
    /// When this report was produced.
    pub timestamp: DateTime<Utc>,
    /// Whether any workspace drifted.
    pub has_drift: bool,
    /// Per-workspace reports, in plan order.
    pub workspaces: Vec<WorkspaceDriftReport>,
}

/// `drift`: infrastructure and (unless `refresh_only`) configuration drift
/// per workspace, in plan order (§4.8.3).
///
/// Outputs are cached for downstream injections only when a workspace has
/// no drift of either kind; stale values from a drifted workspace must not
/// poison other reports in the same run.
pub async fn drift(
    ctx: &mut ExecutionContext,
    runner: &dyn ProcessRunner,
    store: &StateStore,
    refresh_only: bool,
) -> Result<DriftReport> {
    validate_env(&store.read()?, &ctx.env)?;

    let monorepo = Arc::clone(&ctx.monorepo);
    let execution_plan = ExecutionPlanBuilder::build(ctx)?;

    let mut workspaces = Vec::new();
    let mut any_drift = false;

    for level in &execution_plan.levels {
        for key in &level.workspaces {
            let ws = monorepo.require_workspace(key)?;
            let inputs = resolve_inputs(&monorepo, ctx, runner, store, ws).await?;
            let interop = WorkspaceInterop::new(&monorepo, key, &ctx.env)?;

            let infra_plan = interop.get_drift_plan(runner, store, &inputs).await?;
            let has_infra = infra_plan.has_changes();

            let (config_plan, has_config) = if refresh_only {
                (None, false)
            } else {
                let config_plan = interop.get_plan(runner, store, &inputs, false).await?;
                let has_config = config_plan.has_changes();
                (Some(config_plan), has_config)
            };

            let has_drift = has_infra || has_config;
            any_drift |= has_drift;

            if !has_drift {
                let fetched = interop.get_outputs(runner, store, ctx.ignore_dependencies).await?;
                ctx.cache_outputs(key.clone(), fetched.outputs);
            }

            let provider = ws
                .provider
                .ok_or_else(|| EngineError::internal(format!("workspace {} has no resolved provider", ws.name)))?;

            workspaces.push(WorkspaceDriftReport {
                name: ws.name.clone(),
                provider,
                has_drift,
                infrastructure_drift: DriftSection { has_drift: has_infra, plan: Some(infra_plan) },
                configuration_drift: DriftSection { has_drift: has_config, plan: config_plan },
            });
        }
    }

    Ok(DriftReport { environment: ctx.env.clone(), timestamp: Utc::now(), has_drift: any_drift, workspaces })
}

/// `refreshState`: sequential per-level refresh, then a live (non-stale)
/// output fetch cached for this run (§4.8.4).
pub async fn refresh_state(ctx: &mut ExecutionContext, runner: &dyn ProcessRunner, store: &StateStore) -> Result<()> {
    validate_env(&store.read()?, &ctx.env)?;

    let monorepo = Arc::clone(&ctx.monorepo);
    let execution_plan = ExecutionPlanBuilder::build(ctx)?;

    for level in &execution_plan.levels {
        for key in &level.workspaces {
            let ws = monorepo.require_workspace(key)?;
            let inputs = resolve_inputs(&monorepo, ctx, runner, store, ws).await?;
            let interop = WorkspaceInterop::new(&monorepo, key, &ctx.env)?;

            interop.refresh(runner, store, &inputs).await?;
            let fetched = interop.get_outputs(runner, store, false).await?;
            ctx.cache_outputs(key.clone(), fetched.outputs);
        }
    }

    Ok(())
}
