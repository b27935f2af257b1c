//! Reading properties files from layer directories.
//!
//! A layer is one directory (base or extension). Loading a file name from a
//! layer yields a [`LoadedLayer`]: the parsed [`RawProperties`] and the path
//! of the file they came from, when it existed.

mod loader;
mod parser;

use std::collections::BTreeMap;

pub use loader::{LoadedLayer, PROPERTIES_SUFFIX, list_property_files, load, validate_file_name};

/// Key/value pairs parsed from a single properties file.
///
/// Iteration is ordered by key. Duplicate keys within one file keep the last
/// occurrence.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RawProperties {
    entries: BTreeMap<String, String>,
}

impl RawProperties {
    /// Create an empty set of properties.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Insert `key`, replacing and returning any earlier value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.entries.insert(key.into(), value.into())
    }

    /// Returns the value stored for `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Returns `true` when `key` is present.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` when there are no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Apply `top` over `self`: keys in `top` replace keys in `self`.
    #[must_use]
    pub fn overlay(mut self, top: Self) -> Self {
        self.entries.extend(top.entries);
        self
    }

    pub(crate) fn into_map(self) -> BTreeMap<String, String> {
        self.entries
    }
}

impl<K, V> FromIterator<(K, V)> for RawProperties
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut properties = Self::new();
        for (key, value) in iter {
            properties.insert(key, value);
        }
        properties
    }
}

#[cfg(test)]
mod tests;
