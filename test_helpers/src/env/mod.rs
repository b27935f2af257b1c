//! Helpers for safely mutating environment variables in tests.
//!
//! Every mutation runs under one global re-entrant mutex and returns an RAII
//! guard that puts the variable back (or removes it) when dropped. Guards for
//! the same key restore in LIFO order. Hold an [`EnvScope`] when a test needs
//! the environment to stay untouched by other tests for its whole duration,
//! for example while a background thread reads it.
//!
//! # Examples
//!
//! ```
//! use test_helpers::env;
//!
//! let _g = env::set_var("KRAUSENING_DOC_KEY", "VALUE");
//! assert_eq!(std::env::var("KRAUSENING_DOC_KEY").as_deref(), Ok("VALUE"));
//! ```

use parking_lot::{ReentrantMutex, ReentrantMutexGuard};
use std::ffi::{OsStr, OsString};
use std::fmt;
use std::sync::LazyLock;

static ENV_MUTEX: LazyLock<ReentrantMutex<()>> = LazyLock::new(ReentrantMutex::default);

/// Restores one environment variable to its prior state on drop.
#[must_use = "dropping restores the prior value"]
pub struct EnvVarGuard {
    key: String,
    original: Option<OsString>,
}

impl fmt::Debug for EnvVarGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnvVarGuard")
            .field("key", &self.key)
            .field("had_original", &self.original.is_some())
            .finish()
    }
}

impl Drop for EnvVarGuard {
    fn drop(&mut self) {
        let _lock = ENV_MUTEX.lock();
        match self.original.take() {
            // SAFETY: environment writes are serialised by `ENV_MUTEX`.
            Some(value) => unsafe { std::env::set_var(&self.key, value) },
            // SAFETY: environment writes are serialised by `ENV_MUTEX`.
            None => unsafe { std::env::remove_var(&self.key) },
        }
    }
}

/// Holds the global environment lock; mutations made through it share the
/// lock instead of re-acquiring it.
#[must_use = "dropping releases the environment lock"]
pub struct EnvVarLock {
    _guard: ReentrantMutexGuard<'static, ()>,
}

impl EnvVarLock {
    /// Set `key` to `value` while the lock is held.
    pub fn set_var(&self, key: impl Into<String>, value: impl AsRef<OsStr>) -> EnvVarGuard {
        let key = key.into();
        let original = std::env::var_os(&key);
        // SAFETY: `self` holds `ENV_MUTEX`.
        unsafe { std::env::set_var(&key, value) };
        EnvVarGuard { key, original }
    }

    /// Remove `key` while the lock is held.
    pub fn remove_var(&self, key: impl Into<String>) -> EnvVarGuard {
        let key = key.into();
        let original = std::env::var_os(&key);
        // SAFETY: `self` holds `ENV_MUTEX`.
        unsafe { std::env::remove_var(&key) };
        EnvVarGuard { key, original }
    }
}

/// Keeps the environment lock and a set of guards alive together.
///
/// Guards are restored before the lock is released.
#[must_use = "dropping releases the environment lock and restores guards"]
pub struct EnvScope {
    guards: Vec<EnvVarGuard>,
    _lock: EnvVarLock,
}

impl Drop for EnvScope {
    fn drop(&mut self) {
        while let Some(guard) = self.guards.pop() {
            drop(guard);
        }
    }
}

/// Acquire the global environment lock.
pub fn lock() -> EnvVarLock {
    EnvVarLock {
        _guard: ENV_MUTEX.lock(),
    }
}

/// Set `key` to `value`, returning a guard that restores the prior value.
///
/// # Examples
///
/// ```
/// use test_helpers::env;
///
/// {
///     let _g = env::set_var("KRAUSENING_DOC_SET", "on");
///     assert_eq!(std::env::var("KRAUSENING_DOC_SET").as_deref(), Ok("on"));
/// }
/// assert!(std::env::var("KRAUSENING_DOC_SET").is_err());
/// ```
pub fn set_var(key: impl Into<String>, value: impl AsRef<OsStr>) -> EnvVarGuard {
    lock().set_var(key, value)
}

/// Remove `key`, returning a guard that restores the prior value.
pub fn remove_var(key: impl Into<String>) -> EnvVarGuard {
    lock().remove_var(key)
}

/// Run `builder` under the lock and keep the lock until the scope drops.
///
/// # Examples
///
/// ```
/// use test_helpers::env;
///
/// let _scope = env::scope_with(|lock| {
///     vec![
///         lock.set_var("KRAUSENING_DOC_A", "1"),
///         lock.remove_var("KRAUSENING_DOC_B"),
///     ]
/// });
/// ```
pub fn scope_with<F>(builder: F) -> EnvScope
where
    F: FnOnce(&EnvVarLock) -> Vec<EnvVarGuard>,
{
    let held = lock();
    let guards = builder(&held);
    EnvScope {
        guards,
        _lock: held,
    }
}
