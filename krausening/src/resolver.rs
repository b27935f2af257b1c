//! Merge precedence and the lookup fallback chain.
//!
//! Lookups resolve in this order: merged file entries (extension over base),
//! an environment variable with exactly the same name, the caller's default,
//! and finally `None`.
//!
//! With a master password configured, `ENC(...)` file values are decrypted
//! when the set is built. Without one they are kept as written.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::crypto::ValueDecryptor;
use crate::environment::Environment;
use crate::file::LoadedLayer;
use crate::properties::PropertySet;
use crate::{KrauseningError, KrauseningResult};

/// Builds [`PropertySet`] snapshots from loaded layers.
#[derive(Debug)]
pub struct Resolver {
    environment: Arc<dyn Environment>,
    decryptor: Option<ValueDecryptor>,
    generations: AtomicU64,
}

impl Resolver {
    /// Create a resolver whose sets fall back to `environment`.
    #[must_use]
    pub fn new(environment: Arc<dyn Environment>) -> Self {
        Self {
            environment,
            decryptor: None,
            generations: AtomicU64::new(0),
        }
    }

    /// Decrypt `ENC(...)` values with `decryptor` when building sets.
    #[must_use]
    pub fn with_decryptor(mut self, decryptor: Option<ValueDecryptor>) -> Self {
        self.decryptor = decryptor;
        self
    }

    /// Returns `true` when `ENC(...)` values are decrypted.
    #[must_use]
    pub const fn decrypts(&self) -> bool {
        self.decryptor.is_some()
    }

    /// Merge `extension` over `base` into a new snapshot for `file_name`.
    ///
    /// Both layers must be fully loaded; entries in `extension` replace
    /// entries in `base` with the same key.
    ///
    /// # Errors
    ///
    /// Returns [`KrauseningError::Decrypt`] when an `ENC(...)` value cannot be
    /// decrypted with the configured password.
    pub fn merge(
        &self,
        file_name: &str,
        base: LoadedLayer,
        extension: LoadedLayer,
    ) -> KrauseningResult<PropertySet> {
        let sources = [base.source, extension.source]
            .into_iter()
            .flatten()
            .collect();
        let mut values = base.properties.overlay(extension.properties).into_map();
        if let Some(decryptor) = &self.decryptor {
            decrypt_values(decryptor, file_name, &mut values)?;
        }
        let generation = self.generations.fetch_add(1, Ordering::Relaxed) + 1;
        Ok(PropertySet::new(
            file_name,
            values,
            sources,
            Arc::clone(&self.environment),
            generation,
        ))
    }
}

fn decrypt_values(
    decryptor: &ValueDecryptor,
    file_name: &str,
    values: &mut BTreeMap<String, String>,
) -> KrauseningResult<()> {
    for (key, value) in values.iter_mut() {
        let Some(payload) = ValueDecryptor::encrypted_payload(value) else {
            continue;
        };
        let plain = decryptor.decrypt(payload).map_err(|reason| {
            Arc::new(KrauseningError::Decrypt {
                file_name: file_name.to_owned(),
                key: key.clone(),
                reason,
            })
        })?;
        *value = plain;
    }
    Ok(())
}

/// Resolve `key` along the fallback chain.
pub(crate) fn lookup(
    values: &BTreeMap<String, String>,
    environment: &dyn Environment,
    key: &str,
    default: Option<&str>,
) -> Option<String> {
    if let Some(value) = values.get(key) {
        return Some(value.clone());
    }
    if let Some(value) = environment.var(key) {
        return Some(value);
    }
    default.map(ToOwned::to_owned)
}
