//! Argument parsing, monorepo loading and dispatch for the `infraglue`
//! binary. Kept in the library target so the bootstrap in `main.rs` stays
//! a thin `#[tokio::main]`-equivalent wrapper.

#![allow(clippy::print_stdout)]

mod args;
mod confirm;
mod format;

use std::path::Path;
use std::sync::Arc;

use clap::Parser;

use infraglue_config::{try_resolve_monorepo, LoaderOptions};
use infraglue_core::{drift, exec, plan, refresh_state, AutoApprove, EngineError, EnvironmentManager, ExecutorConfig, Result};
use infraglue_model::ExecutionContext;
use infraglue_provider::{ProcessRunner, TokioProcessRunner};
use infraglue_state::StateStore;

use args::{Cli, Command};
use confirm::{DeferConfirmation, TtyConfirmation};

/// Parse `argv`, resolve the monorepo, and run the requested command.
pub async fn run() -> Result<()> {
    let cli = Cli::parse();

    env_logger::Builder::new().parse_filters(&cli.log_level).init();

    let start_dir = cli.root.clone().unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| Path::new(".").into()));
    let monorepo = try_resolve_monorepo(&start_dir, LoaderOptions::new().strict(cli.strict))?
        .ok_or_else(|| EngineError::user(format!("no ig.yaml found above {}", start_dir.display())))?;

    let store = Arc::new(StateStore::new(monorepo.root()));
    store.ensure_initialised()?;
    let runner: Arc<dyn ProcessRunner> = Arc::new(TokioProcessRunner);
    let monorepo = Arc::new(monorepo);

    match cli.command {
        Command::SelectEnv { env } => {
            let manager = EnvironmentManager::new(&monorepo);
            manager.select_env(runner.as_ref(), &store, &env).await?;
            println!("selected environment {env}");
            Ok(())
        }

        Command::Plan { env, detailed, json } => {
            let env = resolve_env(&monorepo, &store, env)?;
            let mut ctx = ExecutionContext::new(Arc::clone(&monorepo), cli.workspace.clone(), cli.ignore_dependencies, false, env);
            let outcome = plan(&mut ctx, runner.as_ref(), &store, detailed).await?;
            if json {
                print_json(&outcome);
            } else {
                format::print_plan(&outcome);
            }
            Ok(())
        }

        Command::Apply { env, approve, yes } => {
            let env = resolve_env(&monorepo, &store, env)?;
            let mut ctx = ExecutionContext::new(Arc::clone(&monorepo), cli.workspace.clone(), cli.ignore_dependencies, false, env);
            let config = ExecutorConfig::default();
            let outcome = run_exec(&mut ctx, Arc::clone(&runner), Arc::clone(&store), approve, yes, config).await?;
            format::print_exec_outcome(&outcome);
            Ok(())
        }

        Command::Destroy { env, approve, yes } => {
            let env = resolve_env(&monorepo, &store, env)?;
            let mut ctx = ExecutionContext::new(Arc::clone(&monorepo), cli.workspace.clone(), cli.ignore_dependencies, true, env);
            let config = ExecutorConfig::default();
            let outcome = run_exec(&mut ctx, Arc::clone(&runner), Arc::clone(&store), approve, yes, config).await?;
            format::print_exec_outcome(&outcome);
            Ok(())
        }

        Command::Drift { env, refresh_only, json } => {
            let env = resolve_env(&monorepo, &store, env)?;
            let mut ctx = ExecutionContext::new(Arc::clone(&monorepo), cli.workspace.clone(), cli.ignore_dependencies, false, env);
            let report = drift(&mut ctx, runner.as_ref(), &store, refresh_only).await?;
            if json {
                print_json(&report);
            } else {
                format::print_drift(&report);
            }
            Ok(())
        }

        Command::RefreshState { env } => {
            let env = resolve_env(&monorepo, &store, env)?;
            let mut ctx = ExecutionContext::new(Arc::clone(&monorepo), cli.workspace.clone(), cli.ignore_dependencies, false, env);
            refresh_state(&mut ctx, runner.as_ref(), &store).await?;
            println!("state refreshed");
            Ok(())
        }
    }
}

fn resolve_env(monorepo: &infraglue_model::Monorepo, store: &StateStore, env: Option<String>) -> Result<String> {
    match env {
        Some(env) => Ok(env),
        None => EnvironmentManager::new(monorepo).selected_env(store),
    }
}

async fn run_exec(
    ctx: &mut ExecutionContext,
    runner: Arc<dyn ProcessRunner>,
    store: Arc<StateStore>,
    approve: Option<usize>,
    yes: bool,
    config: ExecutorConfig,
) -> Result<infraglue_core::ExecOutcome> {
    if yes {
        let confirmation = AutoApprove;
        exec(ctx, runner, store, &confirmation, None, config).await
    } else if approve.is_some() {
        let confirmation = DeferConfirmation;
        exec(ctx, runner, store, &confirmation, approve, config).await
    } else {
        let confirmation = TtyConfirmation;
        exec(ctx, runner, store, &confirmation, None, config).await
    }
}

fn print_json<T: serde::Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(body) => println!("{body}"),
        Err(e) => log::error!("failed to serialize output: {e}"),
    }
}
