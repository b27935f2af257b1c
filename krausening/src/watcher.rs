//! Background watching of the layer directories for cached property sets.
//!
//! A [`notify::PollWatcher`] scans the base and extension directories
//! (non-recursively) every poll interval and reports created, modified and
//! removed files. An event for a registered file name refreshes that name in
//! the cache. Failures are logged and the previous snapshot stays published
//! until the next change to the file.
//!
//! A layer directory that does not exist yet is remembered and watched once
//! it appears, checked whenever a name is registered.

use camino::Utf8PathBuf;
use notify::{Config, Event, EventKind, PollWatcher, RecursiveMode, Watcher as _};
use parking_lot::Mutex;
use std::collections::BTreeSet;
use std::ffi::OsStr;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::cache::PropertyCache;
use crate::result_ext::KrauseningResultExt;
use crate::KrauseningResult;

/// State shared with the poll thread's event handler.
#[derive(Debug)]
struct Shared {
    cache: Arc<PropertyCache>,
    names: Mutex<BTreeSet<String>>,
    active: AtomicBool,
}

impl Shared {
    fn snapshot(&self) -> Vec<String> {
        self.names.lock().iter().cloned().collect()
    }

    fn handle(&self, event: &Event) {
        if !self.active.load(Ordering::Acquire) || matches!(event.kind, EventKind::Access(_)) {
            return;
        }
        let touched: BTreeSet<&str> = event
            .paths
            .iter()
            .filter_map(|path| path.file_name().and_then(OsStr::to_str))
            .collect();
        let changed: Vec<String> = {
            let names = self.names.lock();
            touched
                .into_iter()
                .filter(|name| names.contains(*name))
                .map(ToOwned::to_owned)
                .collect()
        };
        for name in changed {
            tracing::debug!(file = %name, kind = ?event.kind, "properties file changed");
            self.reload(&name);
        }
    }

    fn reload(&self, file_name: &str) {
        match self.cache.refresh(file_name) {
            Ok(Some(_)) => {}
            Ok(None) => {
                tracing::debug!(file = file_name, "no longer cached; unwatching");
                self.names.lock().remove(file_name);
            }
            Err(err) => {
                tracing::warn!(file = file_name, error = %err, "reload failed; keeping previous snapshot");
            }
        }
    }
}

/// Handle to the background directory watcher.
///
/// Dropping the handle stops the watcher.
pub struct Watcher {
    poller: Mutex<Option<PollWatcher>>,
    pending: Mutex<Vec<Utf8PathBuf>>,
    shared: Arc<Shared>,
    interval: Duration,
}

impl Watcher {
    /// Start watching the layer directories of `cache`.
    ///
    /// # Errors
    ///
    /// Returns [`KrauseningError::Watch`](crate::KrauseningError::Watch) when
    /// the poll watcher cannot be created or an existing directory cannot be
    /// watched.
    pub fn start(cache: Arc<PropertyCache>, interval: Duration) -> KrauseningResult<Self> {
        let locations = cache.locations();
        let directories: Vec<Utf8PathBuf> = [locations.base(), locations.extensions()]
            .into_iter()
            .flatten()
            .map(ToOwned::to_owned)
            .collect();
        let shared = Arc::new(Shared {
            cache,
            names: Mutex::new(BTreeSet::new()),
            active: AtomicBool::new(true),
        });
        let handler = {
            let shared = Arc::clone(&shared);
            move |result: notify::Result<Event>| match result {
                Ok(event) => shared.handle(&event),
                Err(err) => tracing::warn!(error = %err, "properties watcher error"),
            }
        };
        let config = Config::default()
            .with_poll_interval(interval)
            .with_compare_contents(true);
        let poller = PollWatcher::new(handler, config).into_krausening()?;
        let watcher = Self {
            poller: Mutex::new(Some(poller)),
            pending: Mutex::new(directories),
            shared,
            interval,
        };
        watcher.watch_pending()?;
        tracing::info!(interval = ?interval, "started properties watcher");
        Ok(watcher)
    }

    /// Watch every pending directory that now exists. Returns `true` when at
    /// least one was added.
    fn watch_pending(&self) -> KrauseningResult<bool> {
        let mut pending = self.pending.lock();
        if pending.is_empty() {
            return Ok(false);
        }
        let mut poller = self.poller.lock();
        let Some(poller) = poller.as_mut() else {
            return Ok(false);
        };
        let mut outcome = Ok(false);
        let mut waiting = Vec::new();
        for dir in std::mem::take(&mut *pending) {
            if outcome.is_err() || !dir.is_dir() {
                tracing::debug!(dir = %dir, "properties directory not present yet");
                waiting.push(dir);
                continue;
            }
            match poller
                .watch(dir.as_std_path(), RecursiveMode::NonRecursive)
                .into_krausening()
            {
                Ok(()) => {
                    tracing::debug!(dir = %dir, "watching properties directory");
                    outcome = Ok(true);
                }
                Err(err) => {
                    waiting.push(dir);
                    outcome = Err(err);
                }
            }
        }
        *pending = waiting;
        outcome
    }

    /// Watch `file_name` from now on. Returns `false` if it already was.
    ///
    /// Also starts watching any layer directory that has appeared since the
    /// watcher started, reloading every watched name when one has.
    pub fn register(&self, file_name: &str) -> bool {
        let added = self.shared.names.lock().insert(file_name.to_owned());
        match self.watch_pending() {
            Ok(true) => {
                for name in self.shared.snapshot() {
                    self.shared.reload(&name);
                }
            }
            Ok(false) => {}
            Err(err) => tracing::warn!(error = %err, "could not watch properties directory"),
        }
        added
    }

    /// Stop watching `file_name`.
    pub fn unregister(&self, file_name: &str) -> bool {
        self.shared.names.lock().remove(file_name)
    }

    /// Names currently watched, sorted.
    #[must_use]
    pub fn watched(&self) -> Vec<String> {
        self.shared.snapshot()
    }

    /// Poll interval.
    #[must_use]
    pub const fn interval(&self) -> Duration {
        self.interval
    }

    /// Returns `true` until the watcher is stopped.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.poller.lock().is_some()
    }

    /// Stop watching. Idempotent.
    pub fn stop(&self) {
        self.shared.active.store(false, Ordering::Release);
        if self.poller.lock().take().is_some() {
            tracing::info!("stopped properties watcher");
        }
    }
}

impl fmt::Debug for Watcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Watcher")
            .field("watched", &self.shared.snapshot())
            .field("pending", &*self.pending.lock())
            .field("interval", &self.interval)
            .field("running", &self.is_running())
            .finish_non_exhaustive()
    }
}

impl Drop for Watcher {
    fn drop(&mut self) {
        self.stop();
    }
}
