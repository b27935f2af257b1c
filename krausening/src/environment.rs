//! Sources of environment-variable fallbacks.
//!
//! A [`PropertySet`](crate::PropertySet) consults its environment on every
//! lookup that misses the merged file layers, so values set after the set
//! was loaded are still observed.

use std::collections::HashMap;
use std::fmt;

/// Read access to a set of environment variables.
pub trait Environment: Send + Sync + fmt::Debug {
    /// Returns the value of `key`, or `None` when unset.
    fn var(&self, key: &str) -> Option<String>;
}

/// The live process environment.
///
/// Values that are not valid Unicode are treated as unset.
#[derive(Clone, Copy, Debug, Default)]
pub struct ProcessEnvironment;

impl Environment for ProcessEnvironment {
    fn var(&self, key: &str) -> Option<String> {
        if key.is_empty() || key.contains(['=', '\0']) {
            return None;
        }
        std::env::var_os(key).and_then(|value| value.into_string().ok())
    }
}

/// A fixed map of variables, for embedding and tests.
///
/// # Examples
///
/// ```
/// use krausening::{Environment, FixedEnvironment};
///
/// let env = FixedEnvironment::from_iter([("region", "us-east-1")]);
/// assert_eq!(env.var("region").as_deref(), Some("us-east-1"));
/// assert_eq!(env.var("zone"), None);
/// ```
#[derive(Clone, Debug, Default)]
pub struct FixedEnvironment {
    vars: HashMap<String, String>,
}

impl FixedEnvironment {
    /// Create an empty environment.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace `key`.
    #[must_use]
    pub fn with_var(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.insert(key.into(), value.into());
        self
    }
}

impl<K, V> FromIterator<(K, V)> for FixedEnvironment
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            vars: iter
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        }
    }
}

impl Environment for FixedEnvironment {
    fn var(&self, key: &str) -> Option<String> {
        self.vars.get(key).cloned()
    }
}
