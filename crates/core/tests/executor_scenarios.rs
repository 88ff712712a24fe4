//! End-to-end executor scenarios driven by a fake process runner, so no
//! real `terraform` binary is required.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;

use infraglue_core::{drift, exec, AutoApprove, ExecutorConfig};
use infraglue_model::{EnvironmentConfig, ExecutionContext, InjectionSource, Monorepo, ProviderKind, Workspace};
use infraglue_provider::{ProcessOutput, ProcessRequest, ProcessRunner};
use infraglue_state::StateStore;

fn success(stdout: impl Into<String>) -> ProcessOutput {
    ProcessOutput { status_code: Some(0), stdout: stdout.into(), stderr: String::new() }
}

fn plan_json(add: u32, change: u32, remove: u32, replace: u32) -> String {
    format!(r#"{{"type":"change_summary","changes":{{"add":{add},"change":{change},"remove":{remove},"replace":{replace}}}}}"#)
}

fn outputs_json(pairs: &[(&str, &str)]) -> String {
    let body: Vec<String> =
        pairs.iter().map(|(k, v)| format!(r#""{k}":{{"value":"{v}","sensitive":false}}"#)).collect();
    format!("{{{}}}", body.join(","))
}

/// Dispatches canned stdout by workspace directory name and Terraform verb.
/// Test bodies populate `plans`/`destroy_plans`/`drift_plans`/`outputs` up
/// front; `state_list` defaults to non-empty (not yet destroyed).
struct FakeRunner {
    plans: HashMap<String, String>,
    destroy_plans: HashMap<String, String>,
    drift_plans: HashMap<String, String>,
    outputs: HashMap<String, String>,
    destroyed: std::sync::Mutex<std::collections::HashSet<String>>,
}

impl FakeRunner {
    fn new() -> Self {
        Self {
            plans: HashMap::new(),
            destroy_plans: HashMap::new(),
            drift_plans: HashMap::new(),
            outputs: HashMap::new(),
            destroyed: std::sync::Mutex::new(std::collections::HashSet::new()),
        }
    }

    fn with_workspace(mut self, name: &str, plan: &str, outputs: &str) -> Self {
        self.plans.insert(name.to_string(), plan.to_string());
        self.outputs.insert(name.to_string(), outputs.to_string());
        self
    }

    fn with_destroy_plan(mut self, name: &str, plan: &str) -> Self {
        self.destroy_plans.insert(name.to_string(), plan.to_string());
        self
    }

    fn with_drift_plan(mut self, name: &str, plan: &str) -> Self {
        self.drift_plans.insert(name.to_string(), plan.to_string());
        self
    }
}

fn workspace_name(dir: &Path) -> String {
    dir.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default()
}

#[async_trait]
impl ProcessRunner for FakeRunner {
    async fn run(&self, request: ProcessRequest) -> std::io::Result<ProcessOutput> {
        let name = workspace_name(&request.current_dir);
        let verb = request.args.first().map(String::as_str).unwrap_or_default();

        let output = match verb {
            "version" | "init" => success(""),
            "plan" if request.args.iter().any(|a| a == "-destroy") => {
                success(self.destroy_plans.get(&name).cloned().unwrap_or_else(|| plan_json(0, 0, 0, 0)))
            }
            "plan" if request.args.iter().any(|a| a == "-refresh-only") => {
                success(self.drift_plans.get(&name).cloned().unwrap_or_else(|| plan_json(0, 0, 0, 0)))
            }
            "plan" => success(self.plans.get(&name).cloned().unwrap_or_else(|| plan_json(0, 0, 0, 0))),
            "apply" => success(""),
            "output" => success(self.outputs.get(&name).cloned().unwrap_or_else(|| "{}".to_string())),
            "destroy" => {
                self.destroyed.lock().unwrap_or_else(std::sync::PoisonError::into_inner).insert(name);
                success("")
            }
            "state" => {
                let is_destroyed = self.destroyed.lock().unwrap_or_else(std::sync::PoisonError::into_inner).contains(&name);
                success(if is_destroyed { "" } else { "some_resource.main" })
            }
            _ => success(""),
        };

        Ok(output)
    }
}

fn make_workspace(
    root: &Path,
    name: &str,
    injections: HashMap<String, InjectionSource>,
    depends_on: Vec<String>,
) -> Workspace {
    let path = root.join(name);
    std::fs::create_dir_all(&path).expect("mkdir workspace");
    Workspace {
        name: name.to_string(),
        absolute_path: path,
        monorepo_path: name.to_string(),
        provider: Some(ProviderKind::Terraform),
        injections,
        depends_on,
        envs: HashMap::from([("dev".to_string(), EnvironmentConfig::default())]),
    }
}

fn select_dev_env(store: &StateStore, workspaces: &[&str]) {
    store.update(|s| Ok(s.start_selecting_env("dev"))).expect("start selecting");
    let affected: Vec<String> = workspaces.iter().map(|s| (*s).to_string()).collect();
    store.update(move |s| s.finish_env_selection(&affected)).expect("finish selecting");
}

/// S3: A -> B (injects A:out1) -> C (depends_on B). `exec` in dev, fully
/// auto-approved, must run A then B then C and make A's output visible to
/// B via injection resolution.
#[tokio::test]
async fn exec_linear_chain_wires_injected_outputs_through_the_run() {
    let dir = tempfile::tempdir().expect("tempdir");
    let root = dir.path();

    let ws_a = make_workspace(root, "a", HashMap::new(), vec![]);
    let a_key = ws_a.absolute_path.to_string_lossy().into_owned();

    let mut b_injections = HashMap::new();
    b_injections.insert("in1".to_string(), InjectionSource { workspace: a_key.clone(), key: "out1".to_string() });
    let ws_b = make_workspace(root, "b", b_injections, vec![]);
    let b_key = ws_b.absolute_path.to_string_lossy().into_owned();

    let ws_c = make_workspace(root, "c", HashMap::new(), vec![b_key]);

    let monorepo = Arc::new(Monorepo::new(root.to_path_buf(), vec![ws_a, ws_b, ws_c], vec![]));

    let store = Arc::new(StateStore::new(root));
    select_dev_env(&store, &["a", "b", "c"]);

    let runner: Arc<dyn ProcessRunner> = Arc::new(
        FakeRunner::new()
            .with_workspace("a", &plan_json(1, 0, 0, 0), &outputs_json(&[("out1", "A-value")]))
            .with_workspace("b", &plan_json(1, 0, 0, 0), &outputs_json(&[("out2", "B-value")]))
            .with_workspace("c", &plan_json(1, 0, 0, 0), "{}"),
    );

    let mut ctx = ExecutionContext::new(monorepo, None, false, false, "dev".to_string());
    let confirmation = AutoApprove;

    let outcome = exec(&mut ctx, runner, store, &confirmation, None, ExecutorConfig::default()).await.expect("exec ok");

    assert_eq!(outcome.levels_applied, 3);
    assert_eq!(outcome.levels_total, 3);
    assert_eq!(ctx.cached_outputs(&a_key).and_then(|o| o.get("out1")), Some(&"A-value".to_string()));
}

/// S4: destroy diamond D -> {B,C} -> A. Destroying D must remove its
/// outputs from the context cache (they were cached from an earlier,
/// unrelated run) without touching B/C/A, which destroy afterwards.
#[tokio::test]
async fn exec_destroy_diamond_clears_the_destroyed_workspaces_cache() {
    let dir = tempfile::tempdir().expect("tempdir");
    let root = dir.path();

    let ws_a = make_workspace(root, "a", HashMap::new(), vec![]);
    let a_key = ws_a.absolute_path.to_string_lossy().into_owned();
    let ws_b = make_workspace(root, "b", HashMap::new(), vec![a_key.clone()]);
    let b_key = ws_b.absolute_path.to_string_lossy().into_owned();
    let ws_c = make_workspace(root, "c", HashMap::new(), vec![a_key.clone()]);
    let c_key = ws_c.absolute_path.to_string_lossy().into_owned();
    let ws_d = make_workspace(root, "d", HashMap::new(), vec![b_key.clone(), c_key.clone()]);
    let d_key = ws_d.absolute_path.to_string_lossy().into_owned();

    let monorepo = Arc::new(Monorepo::new(root.to_path_buf(), vec![ws_a, ws_b, ws_c, ws_d], vec![]));

    let store = Arc::new(StateStore::new(root));
    select_dev_env(&store, &["a", "b", "c", "d"]);

    let runner: Arc<dyn ProcessRunner> = Arc::new(
        FakeRunner::new()
            .with_destroy_plan("a", &plan_json(0, 0, 1, 0))
            .with_destroy_plan("b", &plan_json(0, 0, 1, 0))
            .with_destroy_plan("c", &plan_json(0, 0, 1, 0))
            .with_destroy_plan("d", &plan_json(0, 0, 1, 0)),
    );

    let mut ctx = ExecutionContext::new(monorepo, None, false, true, "dev".to_string());
    ctx.cache_outputs(d_key.clone(), HashMap::from([("stale".to_string(), "value".to_string())]));

    let confirmation = AutoApprove;
    let outcome = exec(&mut ctx, runner, store, &confirmation, None, ExecutorConfig::default()).await.expect("exec ok");

    assert_eq!(outcome.levels_total, 3);
    assert!(ctx.cached_outputs(&d_key).is_none());
}

/// S5: a call to `exec` while an environment selection is mid-flight fails
/// instead of running.
#[tokio::test]
async fn exec_fails_while_env_selection_is_mid_flight() {
    let dir = tempfile::tempdir().expect("tempdir");
    let root = dir.path();

    let ws_a = make_workspace(root, "a", HashMap::new(), vec![]);
    let monorepo = Arc::new(Monorepo::new(root.to_path_buf(), vec![ws_a], vec![]));

    let store = Arc::new(StateStore::new(root));
    store.update(|s| Ok(s.start_selecting_env("qa"))).expect("start selecting");

    let runner: Arc<dyn ProcessRunner> = Arc::new(FakeRunner::new());
    let mut ctx = ExecutionContext::new(monorepo, None, false, false, "qa".to_string());
    let confirmation = AutoApprove;

    let err = exec(&mut ctx, runner, store, &confirmation, None, ExecutorConfig::default()).await.unwrap_err();
    assert!(matches!(err, infraglue_core::EngineError::User(_)));
}

/// S6: a workspace with both infrastructure drift (`getDriftPlan` shows a
/// change) and configuration drift (`getPlan` shows a removal) reports
/// drift on both sides and its outputs are not cached for downstream use.
#[tokio::test]
async fn drift_mixed_leaves_drifted_workspace_uncached() {
    let dir = tempfile::tempdir().expect("tempdir");
    let root = dir.path();

    let ws_a = make_workspace(root, "a", HashMap::new(), vec![]);
    let a_key = ws_a.absolute_path.to_string_lossy().into_owned();

    let monorepo = Arc::new(Monorepo::new(root.to_path_buf(), vec![ws_a], vec![]));

    let store = Arc::new(StateStore::new(root));
    select_dev_env(&store, &["a"]);

    let runner: Arc<dyn ProcessRunner> = Arc::new(
        FakeRunner::new().with_drift_plan("a", &plan_json(0, 1, 0, 0)).with_workspace("a", &plan_json(0, 0, 1, 0), "{}"),
    );

    let mut ctx = ExecutionContext::new(monorepo, None, false, false, "dev".to_string());
    let report = drift(&mut ctx, runner.as_ref(), &store, false).await.expect("drift ok");

    assert!(report.has_drift);
    let ws_report = &report.workspaces[0];
    assert!(ws_report.has_drift);
    assert!(ws_report.infrastructure_drift.has_drift);
    assert!(ws_report.configuration_drift.has_drift);
    assert!(ctx.cached_outputs(&a_key).is_none());
}
