//! Environment and directory guards for integration tests.
//!
//! Environment variables are global to the process, so every mutation goes
//! through a shared mutex and tests using these helpers must also be marked
//! `#[serial]`.

use std::env;
use std::ffi::{OsStr, OsString};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, OnceLock};

use tempfile::TempDir;

static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

fn lock() -> MutexGuard<'static, ()> {
    ENV_LOCK
        .get_or_init(|| Mutex::new(()))
        .lock()
        .expect("environment lock poisoned")
}

/// Set an environment variable while holding the global lock.
pub fn set_var(key: impl AsRef<OsStr>, value: impl AsRef<OsStr>) {
    let _guard = lock();
    // SAFETY: the mutex serialises access to the unsynchronised std env calls.
    unsafe { env::set_var(key, value) };
}

/// Remove an environment variable while holding the global lock.
pub fn remove_var(key: impl AsRef<OsStr>) {
    let _guard = lock();
    // SAFETY: the mutex serialises access to the unsynchronised std env calls.
    unsafe { env::remove_var(key) };
}

/// RAII guard that removes `keys` for its lifetime and restores the captured
/// values on drop.
pub struct EnvGuard {
    entries: Vec<(OsString, Option<OsString>)>,
}

impl EnvGuard {
    pub fn new(keys: &[&str]) -> Self {
        let mut entries = Vec::new();
        for key in keys {
            let key = OsString::from(key);
            let previous = env::var_os(&key);
            remove_var(&key);
            entries.push((key, previous));
        }
        Self { entries }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for (key, value) in &mut self.entries {
            match value.take() {
                Some(val) => set_var(&*key, val),
                None => remove_var(&*key),
            }
        }
    }
}

/// RAII guard restoring the working directory on drop.
pub struct DirGuard {
    previous: PathBuf,
}

impl DirGuard {
    pub fn enter(path: impl AsRef<Path>) -> Self {
        let previous = env::current_dir().expect("current dir");
        env::set_current_dir(path.as_ref()).expect("set dir");
        Self { previous }
    }
}

impl Drop for DirGuard {
    fn drop(&mut self) {
        let _ = env::set_current_dir(&self.previous);
    }
}

/// Write `content` to a temporary `.bgm.toml` and return its directory
/// and path.
pub fn write_config(content: &str) -> (TempDir, PathBuf) {
    let dir = TempDir::new().expect("create config dir");
    let path = dir.path().join(".bgm.toml");
    fs::write(&path, content).expect("write config");
    (dir, path)
}

/// Write a config file, point `BGM_CONFIG_PATH` at it, and return the
/// directory and path.
///
/// Callers must create an [`EnvGuard`] that captures `BGM_CONFIG_PATH` before
/// invoking this helper so the variable is removed once the guard drops.
pub fn setup_env_and_config(config_content: &str) -> (TempDir, PathBuf) {
    let (dir, path) = write_config(config_content);
    set_var("BGM_CONFIG_PATH", path.as_os_str());
    (dir, path)
}
