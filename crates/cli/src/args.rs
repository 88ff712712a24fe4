//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Multi-workspace Terraform/Pulumi orchestration.
#[derive(Parser, Debug)]
#[command(name = "infraglue", version, about)]
pub struct Cli {
    /// Monorepo root; defaults to walking up from the current directory
    /// looking for `ig.yaml`.
    #[arg(long, global = true)]
    pub root: Option<PathBuf>,

    /// Scope the operation to this workspace (name or path) and its
    /// transitive dependencies.
    #[arg(long, global = true)]
    pub workspace: Option<String>,

    /// Skip dependency wiring: only `--workspace` runs, and its injections
    /// resolve from persisted state rather than live provider output.
    #[arg(long, global = true)]
    pub ignore_dependencies: bool,

    /// Fail instead of warning when a workspace's provider can't be resolved.
    #[arg(long, global = true)]
    pub strict: bool,

    /// `env_logger` filter string (e.g. `info`, `debug`, `infraglue_core=trace`).
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Select the environment every subsequent operation runs against.
    SelectEnv {
        /// Environment name, as declared under a workspace's `envs` map.
        env: String,
    },

    /// Show what `apply` would do, without applying it.
    Plan {
        /// Environment to plan against; defaults to the currently selected one.
        env: Option<String>,

        /// Pass through to the provider's plan call for a richer diff.
        #[arg(long)]
        detailed: bool,

        /// Print the plan as JSON instead of a human summary.
        #[arg(long)]
        json: bool,
    },

    /// Apply pending changes, level by level.
    Apply {
        /// Environment to apply against; defaults to the currently selected one.
        env: Option<String>,

        /// Skip the confirmation prompt for this level and proceed.
        #[arg(long)]
        approve: Option<usize>,

        /// Approve every level non-interactively (for automation).
        #[arg(long)]
        yes: bool,
    },

    /// Tear down infrastructure, dependants before dependencies.
    Destroy {
        /// Environment to destroy; defaults to the currently selected one.
        env: Option<String>,

        /// Skip the confirmation prompt for this level and proceed.
        #[arg(long)]
        approve: Option<usize>,

        /// Approve every level non-interactively (for automation).
        #[arg(long)]
        yes: bool,
    },

    /// Report infrastructure and configuration drift.
    Drift {
        /// Environment to check; defaults to the currently selected one.
        env: Option<String>,

        /// Only check infrastructure drift, skipping the configuration plan.
        #[arg(long)]
        refresh_only: bool,

        /// Print the report as JSON instead of a human summary.
        #[arg(long)]
        json: bool,
    },

    /// Refresh each workspace's provider state and re-cache its outputs.
    RefreshState {
        /// Environment to refresh; defaults to the currently selected one.
        env: Option<String>,
    },
}
