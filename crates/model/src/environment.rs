//! Per-environment workspace overrides.

use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Overrides declared under `envs.<name>` in a workspace's `ig.yaml`.
///
/// Free-form keys beyond the ones the core understands are accepted and
/// ignored (captured in `extra` so round-tripping the document back to
/// disk, if ever needed, does not lose data).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct EnvironmentConfig {
    /// Variables merged into provider inputs, request wins on collision.
    #[serde(default)]
    pub vars: HashMap<String, String>,

    /// Ordered list of `-var-file=` style files (Terraform only).
    #[serde(default, rename = "var_files")]
    pub var_files: Vec<PathBuf>,

    /// Terraform-only: path to a backend file to copy into the workspace.
    #[serde(default, rename = "backend_file")]
    pub backend_file: Option<PathBuf>,

    /// Terraform-only: backend type used to synthesise a minimal backend block.
    #[serde(default, rename = "backend_type")]
    pub backend_type: Option<String>,

    /// Pulumi-only: merged into the subprocess environment (backend URL, creds).
    #[serde(default, rename = "backend_config")]
    pub backend_config: HashMap<String, String>,

    /// Unrecognised keys, preserved but ignored by the core.
    #[serde(flatten)]
    pub extra: HashMap<String, serde_yaml::Value>,
}
