//! The Terraform adapter: detection, backend/var-file setup, command
//! table and NDJSON parser.

mod parser;

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use chrono::Utc;
use infraglue_model::{Plan, ProviderKind};
use infraglue_state::StateStore;
use serde_json::Value;

use crate::config::ProviderConfig;
use crate::error::{ProviderError, Result};
use crate::process::{ProcessOutput, ProcessRequest, ProcessRunner};
use crate::provider::{Inputs, Outputs, Provider};

use self::parser::PlanAccumulator;

const BACKEND_FILE_NAME: &str = "__ig__backend.tf";
const VARS_FILE_NAME: &str = "terraform-vars.tfvars";

/// Whether `dir` contains at least one `.tf` file (detection is
/// non-recursive and case-insensitive on the extension).
#[must_use]
pub fn detect(dir: &Path) -> bool {
    let Ok(entries) = std::fs::read_dir(dir) else { return false };
    entries.filter_map(std::result::Result::ok).any(|entry| {
        entry
            .path()
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("tf"))
    })
}

/// Terraform provisioning tool adapter. Holds no per-workspace state; every
/// call takes the [`ProviderConfig`] it needs.
#[derive(Debug, Default, Clone, Copy)]
pub struct TerraformProvider;

impl TerraformProvider {
    fn setup_error(&self, workspace: &str, message: impl Into<String>) -> ProviderError {
        ProviderError::setup("terraform", workspace, message)
    }

    async fn run(&self, runner: &dyn ProcessRunner, workspace: &str, request: ProcessRequest) -> Result<ProcessOutput> {
        let display = request.display();
        runner
            .run(request)
            .await
            .map_err(|e| self.setup_error(workspace, format!("failed to spawn `{display}`: {e}")))
    }

    async fn run_checked(
        &self,
        runner: &dyn ProcessRunner,
        workspace: &str,
        request: ProcessRequest,
    ) -> Result<ProcessOutput> {
        let display = request.display();
        let output = self.run(runner, workspace, request).await?;
        if !output.success() {
            return Err(ProviderError::command_failed(
                "terraform",
                workspace,
                format!("`{display}` exited non-zero"),
                display,
                output.status_code,
                output.stderr,
                output.stdout,
            ));
        }
        Ok(output)
    }

    async fn ensure_tool_present(&self, runner: &dyn ProcessRunner, cfg: &ProviderConfig) -> Result<()> {
        self.run_checked(runner, &cfg.alias, ProcessRequest::new("terraform", &cfg.root_path).arg("version")).await?;
        Ok(())
    }

    fn backend_file_path(&self, cfg: &ProviderConfig) -> std::path::PathBuf {
        cfg.root_path.join(BACKEND_FILE_NAME)
    }

    async fn write_backend_file(&self, cfg: &ProviderConfig, env: &str) -> Result<()> {
        let path = self.backend_file_path(cfg);
        let env_cfg = cfg.env(env);

        if let Some(backend_file) = env_cfg.and_then(|e| e.backend_file.as_ref()) {
            let body = std::fs::read_to_string(backend_file)
                .map_err(|e| self.setup_error(&cfg.alias, format!("cannot read backend_file: {e}")))?;
            std::fs::write(&path, body).map_err(|e| self.setup_error(&cfg.alias, e.to_string()))?;
        } else if let Some(backend_type) = env_cfg.and_then(|e| e.backend_type.as_ref()) {
            let body = format!("terraform {{\n  backend \"{backend_type}\" {{}}\n}}\n");
            std::fs::write(&path, body).map_err(|e| self.setup_error(&cfg.alias, e.to_string()))?;
        } else if path.exists() {
            std::fs::remove_file(&path).map_err(|e| self.setup_error(&cfg.alias, e.to_string()))?;
        }

        Ok(())
    }

    async fn write_var_file(&self, cfg: &ProviderConfig, store: &StateStore, inputs: &Inputs, env: &str) -> Result<Vec<String>> {
        let env_cfg = cfg.env(env);

        let mut merged: HashMap<&str, &str> = HashMap::new();
        if let Some(env_cfg) = env_cfg {
            for (k, v) in &env_cfg.vars {
                merged.insert(k, v);
            }
        }
        for (k, v) in inputs {
            merged.insert(k, v);
        }

        let mut body = String::new();
        for (k, v) in &merged {
            body.push_str(&format!("{k} = \"{v}\"\n"));
        }

        let rel = store
            .store_workspace_temp_file(&cfg.root_path, VARS_FILE_NAME, body.as_bytes())
            .map_err(|e| self.setup_error(&cfg.alias, format!("failed to write var file: {e}")))?;

        let mut flags = vec![format!("-var-file={}", rel.display())];
        if let Some(env_cfg) = env_cfg {
            for var_file in &env_cfg.var_files {
                flags.push(format!("-var-file={}", var_file.display()));
            }
        }

        Ok(flags)
    }
}

#[async_trait]
impl Provider for TerraformProvider {
    fn name(&self) -> ProviderKind {
        ProviderKind::Terraform
    }

    async fn select_environment(
        &self,
        cfg: &ProviderConfig,
        runner: &dyn ProcessRunner,
        _store: &StateStore,
        env: &str,
    ) -> Result<()> {
        self.ensure_tool_present(runner, cfg).await?;
        self.write_backend_file(cfg, env).await?;

        let mut request = ProcessRequest::new("terraform", &cfg.root_path).arg("init");
        if let Some(env_cfg) = cfg.env(env) {
            for (k, v) in &env_cfg.backend_config {
                request = request.arg(format!("--backend-config={k}={v}"));
            }
        }
        request = request.arg("--reconfigure");

        self.run_checked(runner, &cfg.alias, request).await?;
        Ok(())
    }

    async fn get_plan(
        &self,
        cfg: &ProviderConfig,
        runner: &dyn ProcessRunner,
        store: &StateStore,
        inputs: &Inputs,
        env: &str,
        _detailed: bool,
    ) -> Result<Plan> {
        let var_flags = self.write_var_file(cfg, store, inputs, env).await?;
        let request = ProcessRequest::new("terraform", &cfg.root_path).arg("plan").arg("--json").args(var_flags);
        let output = self.run_checked(runner, &cfg.alias, request).await?;
        Ok(self.build_plan(cfg, &output.stdout))
    }

    async fn apply(
        &self,
        cfg: &ProviderConfig,
        runner: &dyn ProcessRunner,
        store: &StateStore,
        inputs: &Inputs,
        env: &str,
    ) -> Result<Outputs> {
        let var_flags = self.write_var_file(cfg, store, inputs, env).await?;
        let request =
            ProcessRequest::new("terraform", &cfg.root_path).arg("apply").arg("--auto-approve").arg("--json").args(var_flags);
        self.run_checked(runner, &cfg.alias, request).await?;

        self.get_outputs(cfg, runner, env).await
    }

    async fn get_outputs(&self, cfg: &ProviderConfig, runner: &dyn ProcessRunner, _env: &str) -> Result<Outputs> {
        let request = ProcessRequest::new("terraform", &cfg.root_path).arg("output").arg("--json");
        let output = self.run_checked(runner, &cfg.alias, request).await?;
        parse_outputs_json(&cfg.alias, &output.stdout)
    }

    async fn destroy_plan(
        &self,
        cfg: &ProviderConfig,
        runner: &dyn ProcessRunner,
        store: &StateStore,
        inputs: &Inputs,
        env: &str,
    ) -> Result<Plan> {
        let var_flags = self.write_var_file(cfg, store, inputs, env).await?;
        let request =
            ProcessRequest::new("terraform", &cfg.root_path).arg("plan").arg("-destroy").arg("--json").args(var_flags);
        let output = self.run_checked(runner, &cfg.alias, request).await?;
        Ok(self.build_plan(cfg, &output.stdout))
    }

    async fn destroy(
        &self,
        cfg: &ProviderConfig,
        runner: &dyn ProcessRunner,
        store: &StateStore,
        inputs: &Inputs,
        env: &str,
    ) -> Result<()> {
        let var_flags = self.write_var_file(cfg, store, inputs, env).await?;
        let request = ProcessRequest::new("terraform", &cfg.root_path).arg("destroy").arg("--auto-approve").args(var_flags);
        self.run_checked(runner, &cfg.alias, request).await?;
        Ok(())
    }

    async fn is_destroyed(&self, cfg: &ProviderConfig, runner: &dyn ProcessRunner, _env: &str) -> Result<bool> {
        let request = ProcessRequest::new("terraform", &cfg.root_path).arg("state").arg("list");
        let output = self.run_checked(runner, &cfg.alias, request).await?;
        Ok(output.stdout.trim().is_empty())
    }

    async fn get_drift_plan(
        &self,
        cfg: &ProviderConfig,
        runner: &dyn ProcessRunner,
        store: &StateStore,
        inputs: &Inputs,
        env: &str,
    ) -> Result<Plan> {
        let var_flags = self.write_var_file(cfg, store, inputs, env).await?;
        let request =
            ProcessRequest::new("terraform", &cfg.root_path).arg("plan").arg("-refresh-only").arg("--json").args(var_flags);
        let output = self.run_checked(runner, &cfg.alias, request).await?;
        Ok(self.build_plan(cfg, &output.stdout))
    }

    async fn refresh(
        &self,
        cfg: &ProviderConfig,
        runner: &dyn ProcessRunner,
        store: &StateStore,
        inputs: &Inputs,
        env: &str,
    ) -> Result<()> {
        let var_flags = self.write_var_file(cfg, store, inputs, env).await?;
        let request =
            ProcessRequest::new("terraform", &cfg.root_path).arg("apply").arg("-refresh-only").arg("--auto-approve").args(var_flags);
        self.run_checked(runner, &cfg.alias, request).await?;
        Ok(())
    }

    async fn import_resource(
        &self,
        cfg: &ProviderConfig,
        runner: &dyn ProcessRunner,
        args: &[String],
        _inputs: &Inputs,
        _env: &str,
    ) -> Result<String> {
        let request = ProcessRequest::new("terraform", &cfg.root_path).arg("import").args(args.to_vec());
        let output = self.run_checked(runner, &cfg.alias, request).await?;
        Ok(output.stdout)
    }

    async fn generate_code(
        &self,
        cfg: &ProviderConfig,
        runner: &dyn ProcessRunner,
        args: &[String],
        _inputs: &Inputs,
        _env: &str,
    ) -> Result<String> {
        let request = ProcessRequest::new("terraform", &cfg.root_path).arg("plan").arg("-generate-config-out").args(args.to_vec());
        let output = self.run_checked(runner, &cfg.alias, request).await?;
        Ok(output.stdout)
    }

    async fn exec_any_command(
        &self,
        cfg: &ProviderConfig,
        runner: &dyn ProcessRunner,
        command: &[String],
        _inputs: &Inputs,
        _env: &str,
    ) -> Result<ProcessOutput> {
        let request = ProcessRequest::new("terraform", &cfg.root_path).args(command.to_vec());
        self.run(runner, &cfg.alias, request).await
    }
}

impl TerraformProvider {
    fn build_plan(&self, cfg: &ProviderConfig, stdout: &str) -> Plan {
        let mut acc = PlanAccumulator::default();
        acc.feed(stdout);

        Plan {
            provider: ProviderKind::Terraform,
            project_name: cfg.alias.clone(),
            timestamp: Utc::now(),
            resource_changes: acc.resource_changes,
            outputs: acc.outputs,
            diagnostics: acc.diagnostics,
            change_summary: acc.change_summary,
            metadata: Value::Null,
        }
    }
}

fn parse_outputs_json(workspace: &str, stdout: &str) -> Result<Outputs> {
    let value: Value = serde_json::from_str(stdout.trim())
        .map_err(|e| ProviderError::setup("terraform", workspace, format!("invalid `terraform output --json`: {e}")))?;

    let Value::Object(map) = value else {
        return Ok(Outputs::new());
    };

    let mut outputs = Outputs::new();
    for (name, entry) in map {
        let rendered = match entry.get("value") {
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
            None => String::new(),
        };
        outputs.insert(name, rendered);
    }
    Ok(outputs)
}
