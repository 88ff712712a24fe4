//! `tryReadMonorepo`/`tryResolveMonorepo`: the entry points that turn a
//! directory tree of `ig.yaml` documents into an [`infraglue_model::Monorepo`].

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use infraglue_model::{Export, InjectionSource, Monorepo, ProviderKind, Workspace};
use serde_yaml::Value;

use crate::error::{ConfigError, Result};
use crate::grammar::{resolve_ws_key, split_reference};
use crate::raw::CONFIG_FILE_NAMES;
use crate::validate::{validate_monorepo, validate_workspace};

/// Loader behaviour knobs.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoaderOptions {
    /// Promote an unresolvable per-workspace provider from a skip-with-warning
    /// into a hard error.
    strict: bool,
}

impl LoaderOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn strict(mut self, value: bool) -> Self {
        self.strict = value;
        self
    }
}

fn find_config_file(dir: &Path) -> Option<PathBuf> {
    CONFIG_FILE_NAMES.iter().map(|name| dir.join(name)).find(|path| path.is_file())
}

fn read_yaml(path: &Path) -> Result<Value> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io { path: path.to_path_buf(), source })?;
    serde_yaml::from_str(&text).map_err(|source| ConfigError::Parse { path: path.to_path_buf(), source })
}

/// Read the monorepo rooted at `dir`, or `Ok(None)` if no `ig.(yaml|yml)`
/// exists there — that is not an error, just "no monorepo here".
pub fn try_read_monorepo(dir: &Path, options: LoaderOptions) -> Result<Option<Monorepo>> {
    let Some(config_path) = find_config_file(dir) else { return Ok(None) };

    let raw = read_yaml(&config_path)?;
    let doc = validate_monorepo(raw, &config_path)?;

    let root = std::fs::canonicalize(dir).map_err(|source| ConfigError::Io { path: dir.to_path_buf(), source })?;

    let mut workspaces = Vec::new();
    for pattern in &doc.workspace {
        let dirs = expand_glob(&root, pattern, &config_path)?;
        for ws_dir in dirs {
            if let Some(workspace) = load_workspace(&root, &ws_dir, options)? {
                workspaces.push(workspace);
            }
        }
    }

    let exports = doc
        .output
        .iter()
        .filter_map(|(name, raw_ref)| {
            let (ws_part, key) = split_reference(raw_ref)?;
            Some(Export { name: name.clone(), workspace_key: resolve_ws_key(&root, ws_part), output_key: key.to_string() })
        })
        .collect();

    Ok(Some(Monorepo::new(root, workspaces, exports)))
}

/// Walk parent directories from `start_path` until a monorepo is found
/// whose root is `start_path` or whose workspaces include it. Returns
/// `Ok(None)` once the filesystem root is reached without a match.
pub fn try_resolve_monorepo(start_path: &Path, options: LoaderOptions) -> Result<Option<Monorepo>> {
    let canonical_start =
        std::fs::canonicalize(start_path).map_err(|source| ConfigError::Io { path: start_path.to_path_buf(), source })?;

    let mut candidate = Some(canonical_start.clone());
    while let Some(dir) = candidate {
        if let Some(monorepo) = try_read_monorepo(&dir, options)? {
            let is_root = monorepo.root() == canonical_start.as_path();
            let is_workspace = monorepo.workspaces().iter().any(|w| w.absolute_path == canonical_start);
            if is_root || is_workspace {
                return Ok(Some(monorepo));
            }
        }
        candidate = dir.parent().map(Path::to_path_buf);
    }

    Ok(None)
}

fn expand_glob(root: &Path, pattern: &str, config_path: &Path) -> Result<Vec<PathBuf>> {
    let full_pattern = root.join(pattern);
    let full_pattern = full_pattern.to_string_lossy().into_owned();

    let mut matches = Vec::new();
    let paths = glob::glob(&full_pattern)
        .map_err(|e| ConfigError::Validation { path: config_path.to_path_buf(), field: "workspace".to_string(), message: e.to_string() })?;

    for entry in paths {
        let Ok(path) = entry else { continue };
        if path.is_dir() {
            if let Ok(canonical) = std::fs::canonicalize(&path) {
                matches.push(canonical);
            }
        }
    }

    if matches.is_empty() {
        return Err(ConfigError::GlobNoMatch { path: config_path.to_path_buf(), glob: pattern.to_string() });
    }

    Ok(matches)
}

fn load_workspace(monorepo_root: &Path, ws_dir: &Path, options: LoaderOptions) -> Result<Option<Workspace>> {
    let doc = match find_config_file(ws_dir) {
        Some(path) => {
            let raw = read_yaml(&path)?;
            validate_workspace(raw, &path)?
        }
        None => infraglue_model::WorkspaceDocument::default(),
    };

    let provider = match &doc.provider {
        Some(name) => Some(match name.as_str() {
            "terraform" => ProviderKind::Terraform,
            "pulumi" => ProviderKind::Pulumi,
            other => {
                return Err(ConfigError::UnknownProvider { path: ws_dir.to_path_buf(), name: other.to_string() });
            }
        }),
        None => infraglue_provider::detect(ws_dir),
    };

    let Some(provider) = provider else {
        if options.strict {
            return Err(ConfigError::UnresolvedProvider { path: ws_dir.to_path_buf() });
        }
        log::warn!("skipping workspace {}: could not resolve a provider", ws_dir.display());
        return Ok(None);
    };

    let monorepo_path = pathdiff_lossy(monorepo_root, ws_dir);
    let name = doc.alias.clone().unwrap_or_else(|| monorepo_path.clone());

    let mut injections = HashMap::new();
    for (local_key, raw_ref) in &doc.injection {
        let Some((ws_part, output_key)) = split_reference(raw_ref) else {
            return Err(ConfigError::MalformedReference {
                path: ws_dir.to_path_buf(),
                field: format!("injection.{local_key}"),
                value: raw_ref.clone(),
            });
        };
        injections.insert(
            local_key.clone(),
            InjectionSource { workspace: resolve_ws_key(ws_dir, ws_part), key: output_key.to_string() },
        );
    }

    let depends_on = doc.depends_on.iter().map(|raw| resolve_ws_key(ws_dir, raw)).collect();

    Ok(Some(Workspace {
        name,
        absolute_path: ws_dir.to_path_buf(),
        monorepo_path,
        provider: Some(provider),
        injections,
        depends_on,
        envs: doc.envs,
    }))
}

fn pathdiff_lossy(root: &Path, target: &Path) -> String {
    target.strip_prefix(root).unwrap_or(target).to_string_lossy().into_owned()
}
