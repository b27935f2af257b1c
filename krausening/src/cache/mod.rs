//! Per-file-name memoisation of [`PropertySet`] snapshots.
//!
//! The name-to-slot map sits behind one coarse lock that is only held long
//! enough to find or create a slot. A repeat lookup takes that lock once for
//! a map lookup, then reads the slot's [`ArcSwapOption`] without blocking. A
//! per-slot build lock keeps at most one load in flight per name: concurrent
//! first callers wait for that load and share its result.

use arc_swap::ArcSwapOption;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

use crate::file::{load, validate_file_name};
use crate::properties::PropertySet;
use crate::resolver::Resolver;
use crate::settings::Locations;
use crate::KrauseningResult;

#[derive(Debug, Default)]
struct Slot {
    build: Mutex<()>,
    current: ArcSwapOption<PropertySet>,
}

/// Cache of merged property sets keyed by file name.
#[derive(Debug)]
pub struct PropertyCache {
    locations: Locations,
    resolver: Resolver,
    slots: Mutex<HashMap<String, Arc<Slot>>>,
}

impl PropertyCache {
    /// Create an empty cache reading from `locations`.
    #[must_use]
    pub fn new(locations: Locations, resolver: Resolver) -> Self {
        Self {
            locations,
            resolver,
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Directories this cache reads from.
    #[must_use]
    pub const fn locations(&self) -> &Locations {
        &self.locations
    }

    fn slot(&self, file_name: &str) -> Arc<Slot> {
        let mut slots = self.slots.lock();
        if let Some(slot) = slots.get(file_name) {
            return Arc::clone(slot);
        }
        Arc::clone(slots.entry(file_name.to_owned()).or_default())
    }

    fn existing_slot(&self, file_name: &str) -> Option<Arc<Slot>> {
        self.slots.lock().get(file_name).cloned()
    }

    /// Return the cached set for `file_name`, loading it on first use.
    ///
    /// # Errors
    ///
    /// Returns the load error when the first build fails. Nothing is cached
    /// in that case, so the next call tries again.
    pub fn get_or_load(&self, file_name: &str) -> KrauseningResult<Arc<PropertySet>> {
        self.get_or_build(file_name).map(|(set, _)| set)
    }

    /// Like [`get_or_load`](Self::get_or_load), also reporting whether this
    /// call performed the first build.
    pub(crate) fn get_or_build(
        &self,
        file_name: &str,
    ) -> KrauseningResult<(Arc<PropertySet>, bool)> {
        if let Some(set) = self.existing_slot(file_name).and_then(|s| s.current.load_full()) {
            return Ok((set, false));
        }
        validate_file_name(file_name)?;
        let slot = self.slot(file_name);
        let _building = slot.build.lock();
        if let Some(set) = slot.current.load_full() {
            tracing::trace!(file = file_name, "received snapshot built by another caller");
            return Ok((set, false));
        }
        match self.build(file_name) {
            Ok(set) => {
                slot.current.store(Some(Arc::clone(&set)));
                Ok((set, true))
            }
            Err(err) => {
                self.discard_unbuilt(file_name, &slot);
                Err(err)
            }
        }
    }

    fn discard_unbuilt(&self, file_name: &str, slot: &Arc<Slot>) {
        let mut slots = self.slots.lock();
        let unbuilt = slots
            .get(file_name)
            .is_some_and(|held| Arc::ptr_eq(held, slot) && held.current.load().is_none());
        if unbuilt {
            slots.remove(file_name);
        }
    }

    /// Rebuild `file_name` from disk and publish the result.
    ///
    /// Returns `Ok(None)` when the name is not cached. Readers holding the
    /// previous set keep it; new lookups see the rebuilt one.
    ///
    /// # Errors
    ///
    /// Returns the load error and leaves the previous set published.
    pub fn refresh(&self, file_name: &str) -> KrauseningResult<Option<Arc<PropertySet>>> {
        let Some(slot) = self.existing_slot(file_name) else {
            return Ok(None);
        };
        let _building = slot.build.lock();
        let Some(previous) = slot.current.load_full() else {
            return Ok(None);
        };
        let set = self.build(file_name)?;
        slot.current.store(Some(Arc::clone(&set)));
        tracing::info!(
            file = file_name,
            from = previous.generation(),
            to = set.generation(),
            "reloaded properties"
        );
        Ok(Some(set))
    }

    /// Current set for `file_name` without loading.
    #[must_use]
    pub fn peek(&self, file_name: &str) -> Option<Arc<PropertySet>> {
        self.existing_slot(file_name)
            .and_then(|slot| slot.current.load_full())
    }

    /// Forget `file_name`. Sets already handed out stay valid.
    ///
    /// Returns `true` when a published set was removed.
    pub fn invalidate(&self, file_name: &str) -> bool {
        let removed = self.slots.lock().remove(file_name);
        removed.is_some_and(|slot| slot.current.load().is_some())
    }

    /// Names with a published set, sorted.
    #[must_use]
    pub fn cached_names(&self) -> Vec<String> {
        let slots = self.slots.lock();
        let mut names: Vec<String> = slots
            .iter()
            .filter(|(_, slot)| slot.current.load().is_some())
            .map(|(name, _)| name.clone())
            .collect();
        names.sort();
        names
    }

    #[cfg(test)]
    fn slot_count(&self) -> usize {
        self.slots.lock().len()
    }

    fn build(&self, file_name: &str) -> KrauseningResult<Arc<PropertySet>> {
        let base = load(self.locations.base(), file_name)?;
        let extension = load(self.locations.extensions(), file_name)?;
        let set = self.resolver.merge(file_name, base, extension)?;
        tracing::debug!(
            file = file_name,
            generation = set.generation(),
            entries = set.len(),
            "built property set"
        );
        Ok(Arc::new(set))
    }
}

#[cfg(test)]
mod tests;
