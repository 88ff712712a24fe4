//! Durable, mutex-guarded reads/writes of `<root>/.ig/state.json` and the
//! per-workspace scratch directory under `<root>/.ig/.temp/`.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::error::{Result, StateError};
use crate::state::State;

const IG_DIR: &str = ".ig";
const STATE_FILE: &str = "state.json";
const TEMP_DIR: &str = ".temp";
const GITIGNORE_BODY: &str = "*";

/// Durable state store rooted at a monorepo directory.
///
/// Every mutation goes through [`StateStore::update`], which holds a
/// process-local mutex for the whole read-modify-write so concurrent
/// updates on the same process serialise. Multiple *processes* operating
/// on the same monorepo are outside this guarantee, per the design notes.
pub struct StateStore {
    root: PathBuf,
    lock: Mutex<()>,
}

impl StateStore {
    /// Root the store at `root` (the monorepo directory, not `.ig/` itself).
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into(), lock: Mutex::new(()) }
    }

    fn ig_dir(&self) -> PathBuf {
        self.root.join(IG_DIR)
    }

    fn state_path(&self) -> PathBuf {
        self.ig_dir().join(STATE_FILE)
    }

    /// Read the current state. A missing file is not an error; it reads as
    /// the default (empty) state.
    pub fn read(&self) -> Result<State> {
        let _guard = self.lock.lock().map_err(|_| StateError::Poisoned)?;
        self.read_locked()
    }

    fn read_locked(&self) -> Result<State> {
        match fs::read(self.state_path()) {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(State::default()),
            Err(e) => Err(StateError::Io(e)),
        }
    }

    /// Read-modify-write the state under the process-local mutex.
    ///
    /// `f` receives the current state and returns the next one; the result
    /// is written atomically (temp file + rename) before the mutex is
    /// released, so readers never observe a partial document.
    ///
    /// # Errors
    ///
    /// Propagates I/O or JSON errors, and whatever `f` itself can return
    /// via [`StateError`] (e.g. [`StateError::NotSelecting`] bubbling up
    /// from a `finish_env_selection` call inside the closure).
    pub fn update<F>(&self, f: F) -> Result<State>
    where
        F: FnOnce(State) -> Result<State>,
    {
        let _guard = self.lock.lock().map_err(|_| StateError::Poisoned)?;
        let current = self.read_locked()?;
        let next = f(current)?;
        self.write_locked(&next)?;
        Ok(next)
    }

    fn write_locked(&self, state: &State) -> Result<()> {
        self.ensure_initialised_locked()?;
        let path = self.state_path();
        let tmp_path = path.with_extension("json.tmp");
        let body = serde_json::to_vec_pretty(state)?;
        fs::write(&tmp_path, body)?;
        fs::rename(&tmp_path, &path)?;
        Ok(())
    }

    /// Ensure `<root>/.ig/` exists and carries a `.gitignore` of `*`.
    ///
    /// Failure to create the directory is swallowed only when the cause is
    /// "already exists"; any other I/O failure propagates.
    pub fn ensure_initialised(&self) -> Result<()> {
        let _guard = self.lock.lock().map_err(|_| StateError::Poisoned)?;
        self.ensure_initialised_locked()
    }

    fn ensure_initialised_locked(&self) -> Result<()> {
        match fs::create_dir_all(self.ig_dir()) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {}
            Err(e) => return Err(StateError::Io(e)),
        }

        let gitignore = self.ig_dir().join(".gitignore");
        if !gitignore.exists() {
            fs::write(gitignore, GITIGNORE_BODY)?;
        }

        Ok(())
    }

    /// Write `body` under `<root>/.ig/.temp/<relPath>/<name>`, where
    /// `relPath` is `ws_path` relative to the monorepo root, creating
    /// directories as needed. Returns the scratch file's path relative to
    /// `ws_path`, suitable for passing to a provider CLI run with `ws_path`
    /// as its working directory.
    pub fn store_workspace_temp_file(&self, ws_path: &Path, name: &str, body: &[u8]) -> Result<PathBuf> {
        let _guard = self.lock.lock().map_err(|_| StateError::Poisoned)?;

        let rel = ws_path.strip_prefix(&self.root).unwrap_or(ws_path);
        let scratch_dir = self.ig_dir().join(TEMP_DIR).join(rel);
        fs::create_dir_all(&scratch_dir)?;

        let file_path = scratch_dir.join(name);
        fs::write(&file_path, body)?;

        Ok(relative_from(ws_path, &file_path))
    }
}

/// Compute `target` expressed relative to `base`, using only path
/// components (no filesystem access, so it works for not-yet-existing
/// scratch files).
fn relative_from(base: &Path, target: &Path) -> PathBuf {
    let base_components: Vec<_> = base.components().collect();
    let target_components: Vec<_> = target.components().collect();

    let common = base_components.iter().zip(target_components.iter()).take_while(|(a, b)| a == b).count();

    let mut result = PathBuf::new();
    for _ in common..base_components.len() {
        result.push("..");
    }
    for component in &target_components[common..] {
        result.push(component.as_os_str());
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_missing_file_is_default_state() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = StateStore::new(dir.path());
        let state = store.read().expect("read");
        assert_eq!(state, State::default());
    }

    #[test]
    fn update_persists_across_reads() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = StateStore::new(dir.path());

        store.update(|s| Ok(s.start_selecting_env("dev"))).expect("update");
        let state = store.read().expect("read");
        assert!(state.is_env_selecting());

        store
            .update(|s| s.finish_env_selection(&["a".to_string()]))
            .expect("update");
        let state = store.read().expect("read");
        assert!(state.is_env_selected());
    }

    #[test]
    fn ensure_initialised_writes_gitignore_once() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = StateStore::new(dir.path());
        store.ensure_initialised().expect("init");
        store.ensure_initialised().expect("init again");
        let body = fs::read_to_string(dir.path().join(".ig/.gitignore")).expect("read gitignore");
        assert_eq!(body, "*");
    }

    #[test]
    fn store_workspace_temp_file_returns_relative_path() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = StateStore::new(dir.path());
        let ws_path = dir.path().join("workspaces/app");
        fs::create_dir_all(&ws_path).expect("mkdir");

        let rel = store
            .store_workspace_temp_file(&ws_path, "terraform-vars.tfvars", b"key=\"value\"\n")
            .expect("store");

        let resolved = ws_path.join(&rel);
        let resolved = resolved.components().collect::<PathBuf>();
        assert!(fs::metadata(&resolved).is_ok() || fs::read(resolved).is_ok());
    }
}
