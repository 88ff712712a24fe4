//! The `"<wsPathOrName>:<outputKey>"` reference grammar shared by
//! injections, `depends_on` and monorepo-level `output` entries.

use std::path::{Component, Path, PathBuf};

/// Split `"<wsPathOrName>:<outputKey>"` on its last `:`, since workspace
/// paths use `/` and never contain a colon. Returns `None` if there is no
/// colon at all.
#[must_use]
pub fn split_reference(raw: &str) -> Option<(&str, &str)> {
    raw.rsplit_once(':')
}

/// Resolve a `wsPathOrName` token to the key used for later workspace
/// lookup: path-looking tokens (containing `/` or starting with `.`) are
/// joined against `base_dir` and lexically normalised to an absolute path;
/// anything else is assumed to be an alias and passed through unchanged,
/// since [`infraglue_model::Workspace::matches_key`] accepts either.
#[must_use]
pub fn resolve_ws_key(base_dir: &Path, raw: &str) -> String {
    if raw.contains('/') || raw.starts_with('.') {
        normalize_path(&base_dir.join(raw)).to_string_lossy().into_owned()
    } else {
        raw.to_string()
    }
}

/// Collapse `.`/`..` components without touching the filesystem, so
/// references resolve consistently regardless of directory creation order.
#[must_use]
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::ParentDir => {
                out.pop();
            }
            Component::CurDir => {}
            other => out.push(other.as_os_str()),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_last_colon() {
        assert_eq!(split_reference("../api:db_url"), Some(("../api", "db_url")));
    }

    #[test]
    fn no_colon_is_none() {
        assert_eq!(split_reference("just-a-name"), None);
    }

    #[test]
    fn path_like_token_resolves_relative_to_base() {
        let resolved = resolve_ws_key(Path::new("/repo/services/web"), "../api");
        assert_eq!(resolved, "/repo/services/api");
    }

    #[test]
    fn bare_alias_passes_through() {
        let resolved = resolve_ws_key(Path::new("/repo/services/web"), "api");
        assert_eq!(resolved, "api");
    }
}
