//! Helpers shared by the binary's unit tests.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

static ENV_LOCK: Mutex<()> = Mutex::new(());

/// Serialize tests that read or mutate process environment variables.
pub fn lock_env() -> MutexGuard<'static, ()> {
    ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner())
}

/// Run `f` with `XDG_CONFIG_HOME` pointed at `dir`, restoring the previous
/// value afterwards. Callers must hold [`lock_env`].
pub fn with_config_home<R>(dir: &Path, f: impl FnOnce() -> R) -> R {
    let previous = std::env::var_os("XDG_CONFIG_HOME");
    unsafe { std::env::set_var("XDG_CONFIG_HOME", dir) };
    let result = f();
    match previous {
        Some(v) => unsafe { std::env::set_var("XDG_CONFIG_HOME", v) },
        None => unsafe { std::env::remove_var("XDG_CONFIG_HOME") },
    }
    result
}
