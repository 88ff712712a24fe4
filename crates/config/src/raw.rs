//! Raw `ig.yaml` document shapes, prior to schema validation and mapping.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// The monorepo-root `ig.yaml` document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MonorepoDocument {
    /// Glob patterns identifying workspace directories. Required, non-empty.
    #[serde(default)]
    pub workspace: Vec<String>,
    /// `<exportName> -> "<wsPath>:<outputKey>"`.
    #[serde(default)]
    pub output: HashMap<String, String>,
}

/// The two filenames a document may live under, checked in this order.
pub const CONFIG_FILE_NAMES: [&str; 2] = ["ig.yaml", "ig.yml"];
