//! Process-wide facade over the cache and the watcher.
//!
//! [`PropertyManager::get_instance`] lazily builds one shared manager from
//! the `KRAUSENING_*` environment variables; [`PropertyManager::shutdown`]
//! stops it and releases it so the next call builds a fresh one. Managers
//! can also be built directly from [`ManagerSettings`] when a shared
//! instance is not wanted.

use parking_lot::Mutex;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::cache::PropertyCache;
use crate::environment::{Environment, ProcessEnvironment};
use crate::file::list_property_files;
use crate::properties::PropertySet;
use crate::resolver::Resolver;
use crate::settings::{Locations, ManagerSettings};
use crate::watcher::Watcher;
use crate::KrauseningResult;

static INSTANCE: Mutex<Option<Arc<PropertyManager>>> = Mutex::new(None);

#[derive(Debug)]
enum WatcherState {
    Idle,
    Running(Watcher),
    Stopped,
}

/// Loads, caches and live-reloads properties files.
///
/// # Examples
///
/// ```no_run
/// use krausening::PropertyManager;
///
/// # fn main() -> krausening::KrauseningResult<()> {
/// let manager = PropertyManager::get_instance()?;
/// let props = manager.get_properties("example.properties")?;
/// let region = props.get_or("region", "us-east-1");
/// # let _ = region;
/// PropertyManager::shutdown();
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct PropertyManager {
    cache: Arc<PropertyCache>,
    poll_interval: Duration,
    watcher: Mutex<WatcherState>,
}

impl PropertyManager {
    /// Return the shared manager, building it from the environment on first
    /// use. Concurrent first callers all receive the same instance.
    ///
    /// # Errors
    ///
    /// Returns an error when the settings variables are malformed or a
    /// configured location is not a directory. Nothing is stored in that
    /// case.
    pub fn get_instance() -> KrauseningResult<Arc<Self>> {
        let mut instance = INSTANCE.lock();
        if let Some(manager) = instance.as_ref() {
            return Ok(Arc::clone(manager));
        }
        let manager = Arc::new(Self::new(ManagerSettings::from_env()?)?);
        *instance = Some(Arc::clone(&manager));
        Ok(manager)
    }

    /// Stop and release the shared manager.
    ///
    /// Holders of the old instance can keep reading from it, but it no
    /// longer reloads. Returns `false` when there was no instance.
    pub fn shutdown() -> bool {
        let released = INSTANCE.lock().take();
        released.is_some_and(|manager| {
            manager.stop();
            tracing::info!("krausening manager shut down");
            true
        })
    }

    /// Build a standalone manager that falls back to the process
    /// environment.
    ///
    /// # Errors
    ///
    /// Returns [`KrauseningError::NotADirectory`](crate::KrauseningError::NotADirectory)
    /// when a configured location exists but is not a directory.
    pub fn new(settings: ManagerSettings) -> KrauseningResult<Self> {
        Self::with_environment(settings, Arc::new(ProcessEnvironment))
    }

    /// Build a standalone manager that falls back to `environment`.
    ///
    /// # Errors
    ///
    /// See [`PropertyManager::new`].
    pub fn with_environment(
        settings: ManagerSettings,
        environment: Arc<dyn Environment>,
    ) -> KrauseningResult<Self> {
        let locations = settings.locations()?;
        if settings.decryptor().is_some() {
            tracing::info!("master password configured; encrypted values will be decrypted");
        } else {
            tracing::warn!(
                variable = crate::settings::PASSWORD,
                "no master password configured; encrypted values are returned as written"
            );
        }
        let resolver = Resolver::new(environment).with_decryptor(settings.decryptor().cloned());
        let cache = PropertyCache::new(locations, resolver);
        Ok(Self {
            cache: Arc::new(cache),
            poll_interval: settings.poll_interval(),
            watcher: Mutex::new(WatcherState::Idle),
        })
    }

    /// Return the merged properties for `file_name`, loading them on first
    /// use and watching them for changes afterwards.
    ///
    /// With a master password configured, `ENC(...)` values come back
    /// decrypted.
    ///
    /// A name with no file in either layer yields an empty set whose lookups
    /// fall through to the environment.
    ///
    /// # Errors
    ///
    /// Returns an error when the name is invalid, an existing layer file
    /// cannot be read or parsed, or an encrypted value cannot be decrypted.
    pub fn get_properties(&self, file_name: &str) -> KrauseningResult<Arc<PropertySet>> {
        let (set, built) = self.cache.get_or_build(file_name)?;
        if built {
            self.watch(file_name);
        }
        Ok(set)
    }

    fn watch(&self, file_name: &str) {
        let mut state = self.watcher.lock();
        if matches!(*state, WatcherState::Idle) {
            match Watcher::start(Arc::clone(&self.cache), self.poll_interval) {
                Ok(watcher) => *state = WatcherState::Running(watcher),
                Err(err) => {
                    tracing::error!(error = %err, "could not start properties watcher");
                    return;
                }
            }
        }
        if let WatcherState::Running(watcher) = &*state {
            watcher.register(file_name);
        }
    }

    /// Re-read every cached file now and publish the results.
    ///
    /// Every cached name is attempted; names that fail keep their previous
    /// snapshot. Returns how many sets were rebuilt.
    ///
    /// # Errors
    ///
    /// Returns the first failure after all names were attempted.
    pub fn reload_all(&self) -> KrauseningResult<usize> {
        let started = Instant::now();
        let mut reloaded = 0;
        let mut first_error = None;
        for name in self.cache.cached_names() {
            match self.cache.refresh(&name) {
                Ok(Some(_)) => reloaded += 1,
                Ok(None) => {}
                Err(err) => {
                    tracing::warn!(file = %name, error = %err, "reload failed");
                    first_error.get_or_insert(err);
                }
            }
        }
        tracing::debug!(reloaded, elapsed = ?started.elapsed(), "reloaded cached properties");
        first_error.map_or(Ok(reloaded), Err)
    }

    /// Drop the cached set for `file_name` and stop watching it.
    ///
    /// Sets already handed out stay valid. Returns `true` when a set was
    /// cached.
    pub fn invalidate(&self, file_name: &str) -> bool {
        if let WatcherState::Running(watcher) = &*self.watcher.lock() {
            watcher.unregister(file_name);
        }
        self.cache.invalidate(file_name)
    }

    /// Names of the `.properties` files present in either layer, sorted and
    /// without duplicates.
    ///
    /// # Errors
    ///
    /// Returns an error when a layer directory exists but cannot be listed.
    pub fn available_files(&self) -> KrauseningResult<Vec<String>> {
        let locations = self.cache.locations();
        let mut names = BTreeSet::new();
        for dir in [locations.base(), locations.extensions()]
            .into_iter()
            .flatten()
        {
            names.extend(list_property_files(dir)?);
        }
        Ok(names.into_iter().collect())
    }

    /// Names with a cached set, sorted.
    #[must_use]
    pub fn cached_files(&self) -> Vec<String> {
        self.cache.cached_names()
    }

    /// Directories this manager reads from.
    #[must_use]
    pub fn locations(&self) -> &Locations {
        self.cache.locations()
    }

    /// Returns `true` while the background watcher is running.
    #[must_use]
    pub fn is_watching(&self) -> bool {
        matches!(&*self.watcher.lock(), WatcherState::Running(watcher) if watcher.is_running())
    }

    /// Stop the background watcher and do not start it again.
    ///
    /// Lookups keep working against the snapshots cached so far.
    pub fn stop(&self) {
        let previous = std::mem::replace(&mut *self.watcher.lock(), WatcherState::Stopped);
        drop(previous);
    }
}
