//! The subprocess seam providers run Terraform/Pulumi binaries through.
//!
//! Generalised from a command executor that captured full output with a
//! timeout; here the contract is narrowed to what adapters actually need:
//! run to completion and get back stdout/stderr/exit status, with the
//! working directory and environment overrides providers already compute.

use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;

/// One subprocess invocation: program, args, working directory and
/// environment overlay.
#[derive(Debug, Clone)]
pub struct ProcessRequest {
    pub program: String,
    pub args: Vec<String>,
    pub current_dir: PathBuf,
    pub env: HashMap<String, String>,
}

impl ProcessRequest {
    #[must_use]
    pub fn new(program: impl Into<String>, current_dir: impl Into<PathBuf>) -> Self {
        Self { program: program.into(), args: Vec::new(), current_dir: current_dir.into(), env: HashMap::new() }
    }

    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    #[must_use]
    pub fn args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn envs(mut self, env: HashMap<String, String>) -> Self {
        self.env.extend(env);
        self
    }

    /// The invocation rendered as a single human-readable line, for errors.
    #[must_use]
    pub fn display(&self) -> String {
        let mut parts = vec![self.program.clone()];
        parts.extend(self.args.iter().cloned());
        parts.join(" ")
    }
}

/// Completed process output.
#[derive(Debug, Clone)]
pub struct ProcessOutput {
    pub status_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ProcessOutput {
    #[must_use]
    pub fn success(&self) -> bool {
        self.status_code == Some(0)
    }
}

/// Runs subprocesses on behalf of provider adapters. A trait so tests can
/// substitute a fake runner instead of shelling out to `terraform`/`pulumi`.
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    async fn run(&self, request: ProcessRequest) -> std::io::Result<ProcessOutput>;
}

/// Runs subprocesses with `tokio::process::Command`, inheriting the current
/// process environment and overlaying `request.env` on top of it.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioProcessRunner;

#[async_trait]
impl ProcessRunner for TokioProcessRunner {
    async fn run(&self, request: ProcessRequest) -> std::io::Result<ProcessOutput> {
        let mut cmd = Command::new(&request.program);
        cmd.args(&request.args)
            .current_dir(&request.current_dir)
            .envs(&request.env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let output = cmd.output().await?;

        Ok(ProcessOutput {
            status_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}
