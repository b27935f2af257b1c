//! Immutable merged snapshots of one properties file.

use camino::{Utf8Path, Utf8PathBuf};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::environment::Environment;
use crate::resolver::lookup;

/// Merged base and extension entries for one file name, with environment
/// fallback.
///
/// A `PropertySet` never changes once built. Reloads produce a new set with a
/// higher [`generation`](Self::generation); holders of an older set keep a
/// consistent view.
///
/// # Examples
///
/// ```
/// # fn main() -> krausening::KrauseningResult<()> {
/// use std::sync::Arc;
/// use krausening::{FixedEnvironment, LoadedLayer, RawProperties, Resolver};
///
/// let env = FixedEnvironment::from_iter([("region", "us-east-1")]);
/// let resolver = Resolver::new(Arc::new(env));
/// let base = LoadedLayer {
///     properties: RawProperties::from_iter([("greeting", "hello")]),
///     ..LoadedLayer::unset()
/// };
/// let set = resolver.merge("test.properties", base, LoadedLayer::unset())?;
///
/// assert_eq!(set.get("greeting").as_deref(), Some("hello"));
/// assert_eq!(set.get("region").as_deref(), Some("us-east-1"));
/// assert_eq!(set.get_or("zone", "None"), "None");
/// assert!(set.has("greeting"));
/// assert!(!set.has("region"));
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct PropertySet {
    file_name: String,
    values: BTreeMap<String, String>,
    sources: Vec<Utf8PathBuf>,
    environment: Arc<dyn Environment>,
    generation: u64,
}

impl PropertySet {
    pub(crate) fn new(
        file_name: &str,
        values: BTreeMap<String, String>,
        sources: Vec<Utf8PathBuf>,
        environment: Arc<dyn Environment>,
        generation: u64,
    ) -> Self {
        Self {
            file_name: file_name.to_owned(),
            values,
            sources,
            environment,
            generation,
        }
    }

    /// Resolve `key` through the file layers, then the environment.
    ///
    /// Returns `None` when neither has it; an empty string is a value.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<String> {
        lookup(&self.values, self.environment.as_ref(), key, None)
    }

    /// Resolve `key` through the file layers, then the environment, then
    /// `default`.
    ///
    /// The environment is consulted even though a default is supplied, so an
    /// operator can override any key without editing files.
    #[must_use]
    pub fn get_or(&self, key: &str, default: &str) -> String {
        lookup(&self.values, self.environment.as_ref(), key, Some(default))
            .unwrap_or_else(|| default.to_owned())
    }

    /// Returns `true` when the merged file layers contain `key`.
    ///
    /// The environment is not consulted.
    #[must_use]
    pub fn has(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Name of the file this set was loaded from.
    #[must_use]
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Number of merged file entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` when neither layer supplied any entry.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Merged keys in order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    /// Merged entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Paths of the layer files that existed when the set was built, base
    /// first.
    #[must_use]
    pub fn sources(&self) -> &[Utf8PathBuf] {
        &self.sources
    }

    /// Returns `true` when at least one layer file existed.
    #[must_use]
    pub fn has_sources(&self) -> bool {
        !self.sources.is_empty()
    }

    /// Returns `true` when `path` was one of the layer files.
    #[must_use]
    pub fn is_sourced_from(&self, path: &Utf8Path) -> bool {
        self.sources.iter().any(|source| source == path)
    }

    /// Build sequence number; larger is newer.
    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }
}
