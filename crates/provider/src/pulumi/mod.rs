//! The Pulumi adapter: stack lifecycle, per-invocation config, and the
//! single-document JSON parser.

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

const FILE_BACKEND_PREFIX: &str = "file://";

/// Whether `dir/Pulumi.yaml` is readable.
#[must_use]
pub fn detect(dir: &Path) -> bool {
    dir.join("Pulumi.yaml").is_file()
}

/// Pulumi provisioning tool adapter.
#[derive(Debug, Default, Clone, Copy)]
pub struct PulumiProvider;

impl PulumiProvider {
    fn setup_error(&self, workspace: &str, message: impl Into<String>) -> ProviderError {
        ProviderError::setup("pulumi", workspace, message)
    }

    fn backend_env(&self, cfg: &ProviderConfig, env: &str) -> HashMap<String, String> {
        cfg.env(env).map(|e| e.backend_config.clone()).unwrap_or_default()
    }

    async fn run(&self, runner: &dyn ProcessRunner, workspace: &str, request: ProcessRequest) -> Result<ProcessOutput> {
        let display = request.display();
        runner.run(request).await.map_err(|e| self.setup_error(workspace, format!("failed to spawn `{display}`: {e}")))
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
                "pulumi",
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

    fn request(&self, cfg: &ProviderConfig, env: &str) -> ProcessRequest {
        ProcessRequest::new("pulumi", &cfg.root_path).envs(self.backend_env(cfg, env))
    }

    async fn ensure_backend_dir(&self, cfg: &ProviderConfig, env: &str) -> Result<()> {
        let Some(url) = cfg.env(env).and_then(|e| e.backend_config.get("PULUMI_BACKEND_URL")) else { return Ok(()) };
        let Some(rel) = url.strip_prefix(FILE_BACKEND_PREFIX) else { return Ok(()) };

        let dir = cfg.root_path.join(rel);
        std::fs::create_dir_all(&dir).map_err(|e| self.setup_error(&cfg.alias, format!("cannot create backend dir: {e}")))?;
        Ok(())
    }

    async fn apply_config(&self, cfg: &ProviderConfig, runner: &dyn ProcessRunner, inputs: &Inputs, env: &str) -> Result<()> {
        let mut merged: HashMap<&str, &str> = HashMap::new();
        if let Some(env_cfg) = cfg.env(env) {
            for (k, v) in &env_cfg.vars {
                merged.insert(k, v);
            }
        }
        for (k, v) in inputs {
            merged.insert(k, v);
        }

        for (k, v) in merged {
            let request = self.request(cfg, env).arg("config").arg("set").arg(k).arg(v);
            self.run_checked(runner, &cfg.alias, request).await?;
        }

        Ok(())
    }

    fn build_plan(&self, cfg: &ProviderConfig, stdout: &str) -> Plan {
        let mut acc = PlanAccumulator::default();
        acc.feed(stdout);

        Plan {
            provider: ProviderKind::Pulumi,
            project_name: cfg.alias.clone(),
            timestamp: Utc::now(),
            resource_changes: acc.resource_changes,
            outputs: acc.outputs,
            diagnostics: Vec::new(),
            change_summary: acc.change_summary,
            metadata: Value::Null,
        }
    }
}

#[async_trait]
impl Provider for PulumiProvider {
    fn name(&self) -> ProviderKind {
        ProviderKind::Pulumi
    }

    async fn select_environment(
        &self,
        cfg: &ProviderConfig,
        runner: &dyn ProcessRunner,
        _store: &StateStore,
        env: &str,
    ) -> Result<()> {
        self.ensure_backend_dir(cfg, env).await?;

        self.run_checked(runner, &cfg.alias, self.request(cfg, env).arg("install")).await?;

        let select = self.request(cfg, env).arg("stack").arg("select").arg(env);
        let output = self.run(runner, &cfg.alias, select).await?;

        if output.success() {
            return Ok(());
        }

        if output.stderr.contains(&format!("no stack named '{env}' found")) {
            self.run_checked(runner, &cfg.alias, self.request(cfg, env).arg("stack").arg("init").arg(env)).await?;
            self.run_checked(runner, &cfg.alias, self.request(cfg, env).arg("stack").arg("select").arg(env)).await?;
            return Ok(());
        }

        Err(ProviderError::command_failed(
            "pulumi",
            &cfg.alias,
            "stack select failed",
            "pulumi stack select",
            output.status_code,
            output.stderr,
            output.stdout,
        ))
    }

    async fn get_plan(
        &self,
        cfg: &ProviderConfig,
        runner: &dyn ProcessRunner,
        _store: &StateStore,
        inputs: &Inputs,
        env: &str,
        _detailed: bool,
    ) -> Result<Plan> {
        self.apply_config(cfg, runner, inputs, env).await?;
        let request = self.request(cfg, env).arg("preview").arg("--stack").arg(env).arg("--json").arg("--diff");
        let output = self.run_checked(runner, &cfg.alias, request).await?;
        Ok(self.build_plan(cfg, &output.stdout))
    }

    async fn apply(
        &self,
        cfg: &ProviderConfig,
        runner: &dyn ProcessRunner,
        _store: &StateStore,
        inputs: &Inputs,
        env: &str,
    ) -> Result<Outputs> {
        self.apply_config(cfg, runner, inputs, env).await?;
        let request = self.request(cfg, env).arg("up").arg("--yes").arg("--json");
        self.run_checked(runner, &cfg.alias, request).await?;
        self.get_outputs(cfg, runner, env).await
    }

    async fn get_outputs(&self, cfg: &ProviderConfig, runner: &dyn ProcessRunner, env: &str) -> Result<Outputs> {
        let request = self.request(cfg, env).arg("stack").arg("output").arg("--json");
        let output = self.run_checked(runner, &cfg.alias, request).await?;
        parse_outputs_json(&cfg.alias, &output.stdout)
    }

    async fn destroy_plan(
        &self,
        cfg: &ProviderConfig,
        runner: &dyn ProcessRunner,
        _store: &StateStore,
        inputs: &Inputs,
        env: &str,
    ) -> Result<Plan> {
        self.apply_config(cfg, runner, inputs, env).await?;
        let request = self.request(cfg, env).arg("destroy").arg("--preview-only").arg("--stack").arg(env).arg("--diff").arg("--json");
        let output = self.run_checked(runner, &cfg.alias, request).await?;
        Ok(self.build_plan(cfg, &output.stdout))
    }

    async fn destroy(
        &self,
        cfg: &ProviderConfig,
        runner: &dyn ProcessRunner,
        _store: &StateStore,
        inputs: &Inputs,
        env: &str,
    ) -> Result<()> {
        self.apply_config(cfg, runner, inputs, env).await?;
        let request = self.request(cfg, env).arg("destroy").arg("--yes").arg("--stack").arg(env);
        self.run_checked(runner, &cfg.alias, request).await?;
        Ok(())
    }

    async fn is_destroyed(&self, cfg: &ProviderConfig, runner: &dyn ProcessRunner, env: &str) -> Result<bool> {
        let list_request = self.request(cfg, env).arg("stack").arg("ls").arg("--json");
        let list_output = self.run_checked(runner, &cfg.alias, list_request).await?;
        let stacks: Value = serde_json::from_str(list_output.stdout.trim())
            .map_err(|e| self.setup_error(&cfg.alias, format!("invalid `pulumi stack ls --json`: {e}")))?;

        let exists = stacks
            .as_array()
            .is_some_and(|stacks| stacks.iter().any(|s| s.get("name").and_then(Value::as_str) == Some(env)));

        if !exists {
            return Ok(true);
        }

        let export_request = self.request(cfg, env).arg("stack").arg("--stack").arg(env).arg("export");
        let export_output = self.run_checked(runner, &cfg.alias, export_request).await?;
        let doc: Value = serde_json::from_str(export_output.stdout.trim())
            .map_err(|e| self.setup_error(&cfg.alias, format!("invalid `pulumi stack export`: {e}")))?;

        let resources = doc.get("deployment").and_then(|d| d.get("resources"));
        let has_resources = resources.and_then(Value::as_array).is_some_and(|r| !r.is_empty());
        Ok(!has_resources)
    }

    async fn get_drift_plan(
        &self,
        cfg: &ProviderConfig,
        runner: &dyn ProcessRunner,
        _store: &StateStore,
        inputs: &Inputs,
        env: &str,
    ) -> Result<Plan> {
        self.apply_config(cfg, runner, inputs, env).await?;
        let request = self.request(cfg, env).arg("refresh").arg("--preview-only").arg("--stack").arg(env).arg("--json");
        let output = self.run_checked(runner, &cfg.alias, request).await?;
        Ok(self.build_plan(cfg, &output.stdout))
    }

    async fn refresh(
        &self,
        cfg: &ProviderConfig,
        runner: &dyn ProcessRunner,
        _store: &StateStore,
        inputs: &Inputs,
        env: &str,
    ) -> Result<()> {
        self.apply_config(cfg, runner, inputs, env).await?;
        let request = self.request(cfg, env).arg("refresh").arg("--yes").arg("--stack").arg(env);
        self.run_checked(runner, &cfg.alias, request).await?;
        Ok(())
    }

    async fn import_resource(
        &self,
        cfg: &ProviderConfig,
        runner: &dyn ProcessRunner,
        args: &[String],
        _inputs: &Inputs,
        env: &str,
    ) -> Result<String> {
        let request = self.request(cfg, env).arg("import").args(args.to_vec());
        let output = self.run_checked(runner, &cfg.alias, request).await?;
        Ok(output.stdout)
    }

    async fn generate_code(
        &self,
        cfg: &ProviderConfig,
        runner: &dyn ProcessRunner,
        args: &[String],
        _inputs: &Inputs,
        env: &str,
    ) -> Result<String> {
        let request = self.request(cfg, env).arg("convert").args(args.to_vec());
        let output = self.run_checked(runner, &cfg.alias, request).await?;
        Ok(output.stdout)
    }

    async fn exec_any_command(
        &self,
        cfg: &ProviderConfig,
        runner: &dyn ProcessRunner,
        command: &[String],
        _inputs: &Inputs,
        env: &str,
    ) -> Result<ProcessOutput> {
        let request = self.request(cfg, env).args(command.to_vec());
        self.run(runner, &cfg.alias, request).await
    }
}

fn parse_outputs_json(workspace: &str, stdout: &str) -> Result<Outputs> {
    let value: Value = serde_json::from_str(stdout.trim())
        .map_err(|e| ProviderError::setup("pulumi", workspace, format!("invalid `pulumi stack output --json`: {e}")))?;

    let Value::Object(map) = value else {
        return Ok(Outputs::new());
    };

    let mut outputs = Outputs::new();
    for (name, value) in map {
        let rendered = match value {
            Value::String(s) => s,
            other => other.to_string(),
        };
        outputs.insert(name, rendered);
    }
    Ok(outputs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_outputs_json_flattens_structured_values() {
        let stdout = r#"{"bucket_name":"my-bucket","tags":{"env":"qa"}}"#;
        let outputs = parse_outputs_json("demo", stdout).expect("parses");
        assert_eq!(outputs["bucket_name"], "my-bucket");
        assert_eq!(outputs["tags"], r#"{"env":"qa"}"#);
    }
}
