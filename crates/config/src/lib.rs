#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]
#![deny(clippy::todo)]
#![deny(clippy::panic)]

//! # infraglue-config
//!
//! Loads a directory tree of `ig.yaml` documents into an
//! [`infraglue_model::Monorepo`]: glob expansion, provider resolution,
//! the injection/`depends_on`/`output` reference grammar, and schema
//! validation with dotted-path errors.

mod error;
mod grammar;
mod loader;
mod raw;
mod validate;

pub use error::{ConfigError, Result};
pub use loader::{try_read_monorepo, try_resolve_monorepo, LoaderOptions};
pub use raw::MonorepoDocument;

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write(path: &std::path::Path, body: &str) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("mkdir");
        }
        fs::write(path, body).expect("write");
    }

    #[test]
    fn reads_a_minimal_monorepo_with_one_terraform_workspace() {
        let dir = tempfile::tempdir().expect("tempdir");
        let root = dir.path();

        write(&root.join("ig.yaml"), "workspace: [\"services/*\"]\n");
        write(&root.join("services/api/main.tf"), "");

        let monorepo = try_read_monorepo(root, LoaderOptions::new()).expect("read ok").expect("monorepo present");
        assert_eq!(monorepo.workspaces().len(), 1);
        assert_eq!(monorepo.workspaces()[0].monorepo_path, "services/api");
    }

    #[test]
    fn missing_config_file_is_not_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let monorepo = try_read_monorepo(dir.path(), LoaderOptions::new()).expect("read ok");
        assert!(monorepo.is_none());
    }

    #[test]
    fn unresolved_provider_is_skipped_by_default_but_errors_when_strict() {
        let dir = tempfile::tempdir().expect("tempdir");
        let root = dir.path();

        write(&root.join("ig.yaml"), "workspace: [\"services/*\"]\n");
        write(&root.join("services/empty/.keep"), "");

        let monorepo = try_read_monorepo(root, LoaderOptions::new()).expect("read ok").expect("monorepo present");
        assert!(monorepo.workspaces().is_empty());

        let err = try_read_monorepo(root, LoaderOptions::new().strict(true)).expect_err("should error in strict mode");
        assert!(matches!(err, ConfigError::UnresolvedProvider { .. }));
    }

    #[test]
    fn resolve_walks_up_to_find_the_monorepo_root() {
        let dir = tempfile::tempdir().expect("tempdir");
        let root = dir.path();

        write(&root.join("ig.yaml"), "workspace: [\"services/*\"]\n");
        write(&root.join("services/api/main.tf"), "");

        let found = try_resolve_monorepo(&root.join("services/api"), LoaderOptions::new())
            .expect("resolve ok")
            .expect("found monorepo");
        assert_eq!(found.workspaces().len(), 1);
    }
}
