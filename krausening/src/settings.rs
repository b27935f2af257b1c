//! Manager configuration: layer directories and the watcher poll interval.
//!
//! Settings are read once, when a manager is built. [`ManagerSettings::from_env`]
//! reads the `KRAUSENING_`-prefixed variables; the builder methods let
//! callers supply the same values directly.
//!
//! Directory and password variables are taken as raw strings, so a directory
//! named `2024` or `true` stays a path. Only the poll interval is typed.

use camino::{Utf8Path, Utf8PathBuf};
use figment::Figment;
use figment::providers::Env;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

use crate::crypto::ValueDecryptor;
use crate::result_ext::KrauseningResultExt;
use crate::{KrauseningError, KrauseningResult};

/// Environment variable naming the base layer directory.
pub const BASE_LOCATION: &str = "KRAUSENING_BASE";

/// Environment variable naming the extension layer directory.
pub const EXTENSIONS_LOCATION: &str = "KRAUSENING_EXTENSIONS";

/// Environment variable holding the watcher poll interval in milliseconds.
pub const POLL_INTERVAL: &str = "KRAUSENING_POLL_INTERVAL_MS";

/// Environment variable holding the master password for `ENC(...)` values.
pub const PASSWORD: &str = "KRAUSENING_PASSWORD";

const ENV_PREFIX: &str = "KRAUSENING_";

/// Poll interval used when none is configured.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1000);

/// Shortest poll interval accepted; shorter values are raised to it.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(10);

#[derive(Debug, Default, Deserialize)]
struct TypedSettings {
    poll_interval_ms: Option<u64>,
}

fn non_blank(value: String) -> Option<String> {
    (!value.trim().is_empty()).then_some(value)
}

/// Settings used to build a [`PropertyManager`](crate::PropertyManager).
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use krausening::ManagerSettings;
///
/// let settings = ManagerSettings::new()
///     .with_base("config/base")
///     .with_extensions("config/local")
///     .with_poll_interval(Duration::from_millis(250));
/// assert_eq!(settings.base().map(|p| p.as_str()), Some("config/base"));
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ManagerSettings {
    base: Option<Utf8PathBuf>,
    extensions: Option<Utf8PathBuf>,
    poll_interval: Duration,
    decryptor: Option<ValueDecryptor>,
}

impl Default for ManagerSettings {
    fn default() -> Self {
        Self::new()
    }
}

impl ManagerSettings {
    /// Settings with no layer directories and the default poll interval.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            base: None,
            extensions: None,
            poll_interval: DEFAULT_POLL_INTERVAL,
            decryptor: None,
        }
    }

    /// Read settings from `KRAUSENING_BASE`, `KRAUSENING_EXTENSIONS`,
    /// `KRAUSENING_POLL_INTERVAL_MS` and `KRAUSENING_PASSWORD`. Blank values
    /// count as unset.
    ///
    /// # Errors
    ///
    /// Returns [`KrauseningError::Settings`] when the poll interval is not a
    /// whole number of milliseconds.
    pub fn from_env() -> KrauseningResult<Self> {
        let typed: TypedSettings =
            Figment::from(Env::prefixed(ENV_PREFIX).only(&["poll_interval_ms"]))
                .extract()
                .into_krausening()?;
        let mut settings = Self::new();
        for (key, value) in Env::prefixed(ENV_PREFIX)
            .only(&["base", "extensions", "password"])
            .iter()
        {
            let Some(value) = non_blank(value) else {
                continue;
            };
            if key == "base" {
                settings.base = Some(Utf8PathBuf::from(value));
            } else if key == "extensions" {
                settings.extensions = Some(Utf8PathBuf::from(value));
            } else {
                settings.decryptor = Some(ValueDecryptor::new(value));
            }
        }
        if let Some(ms) = typed.poll_interval_ms {
            settings = settings.with_poll_interval(Duration::from_millis(ms));
        }
        Ok(settings)
    }

    /// Use `path` as the base layer directory.
    #[must_use]
    pub fn with_base(mut self, path: impl Into<Utf8PathBuf>) -> Self {
        self.base = Some(path.into());
        self
    }

    /// Use `path` as the extension layer directory.
    #[must_use]
    pub fn with_extensions(mut self, path: impl Into<Utf8PathBuf>) -> Self {
        self.extensions = Some(path.into());
        self
    }

    /// Poll for file changes every `interval` (at least [`MIN_POLL_INTERVAL`]).
    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval.max(MIN_POLL_INTERVAL);
        self
    }

    /// Decrypt `ENC(...)` values with `password`.
    #[must_use]
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.decryptor = Some(ValueDecryptor::new(password));
        self
    }

    /// Configured base directory.
    #[must_use]
    pub fn base(&self) -> Option<&Utf8Path> {
        self.base.as_deref()
    }

    /// Configured extension directory.
    #[must_use]
    pub fn extensions(&self) -> Option<&Utf8Path> {
        self.extensions.as_deref()
    }

    /// Watcher poll interval.
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Decryptor for `ENC(...)` values, when a master password is set.
    #[must_use]
    pub const fn decryptor(&self) -> Option<&ValueDecryptor> {
        self.decryptor.as_ref()
    }

    /// Validate the directories into [`Locations`].
    ///
    /// # Errors
    ///
    /// See [`Locations::new`].
    pub fn locations(&self) -> KrauseningResult<Locations> {
        Locations::new(self.base.clone(), self.extensions.clone())
    }
}

/// The base and extension directories a manager reads from.
///
/// Fixed for the lifetime of the manager that owns it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Locations {
    base: Option<Utf8PathBuf>,
    extensions: Option<Utf8PathBuf>,
}

impl Locations {
    /// Check and capture the two layer directories.
    ///
    /// A directory that does not exist yet is accepted and logged; files
    /// created there later are picked up by the watcher.
    ///
    /// # Errors
    ///
    /// Returns [`KrauseningError::NotADirectory`] when a path exists but is
    /// not a directory.
    pub fn new(
        base: Option<Utf8PathBuf>,
        extensions: Option<Utf8PathBuf>,
    ) -> KrauseningResult<Self> {
        match base.as_deref() {
            Some(path) => {
                check_directory(BASE_LOCATION, path)?;
                tracing::info!(base = %path, "krausening base location");
            }
            None => {
                tracing::warn!("{BASE_LOCATION} not set; only extensions and environment apply");
            }
        }
        match extensions.as_deref() {
            Some(path) => {
                check_directory(EXTENSIONS_LOCATION, path)?;
                tracing::info!(extensions = %path, "krausening extensions location");
            }
            None => tracing::debug!("{EXTENSIONS_LOCATION} not set"),
        }
        Ok(Self { base, extensions })
    }

    /// Base layer directory.
    #[must_use]
    pub fn base(&self) -> Option<&Utf8Path> {
        self.base.as_deref()
    }

    /// Extension layer directory.
    #[must_use]
    pub fn extensions(&self) -> Option<&Utf8Path> {
        self.extensions.as_deref()
    }
}

fn check_directory(variable: &'static str, path: &Utf8Path) -> KrauseningResult<()> {
    if path.is_dir() {
        return Ok(());
    }
    if path.exists() {
        return Err(Arc::new(KrauseningError::NotADirectory {
            variable,
            path: path.to_path_buf(),
        }));
    }
    tracing::error!(
        location = %path,
        "{variable} refers to a location that does not exist"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(
        unfulfilled_lint_expectations,
        reason = "clippy::expect_used is denied globally; tests may not hit those branches"
    )]
    #![expect(clippy::expect_used, reason = "tests panic to surface setup failures")]

    use super::*;
    use rstest::rstest;
    use tempfile::TempDir;
    use test_helpers::env as test_env;

    fn utf8(dir: &TempDir) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf-8 temp dir")
    }

    #[rstest]
    #[case::absolute("/srv/config/base")]
    #[case::integer("2024")]
    #[case::boolean("true")]
    #[case::float("1.5")]
    #[case::bracketed("[a]")]
    fn reads_prefixed_variables(#[case] base: &str) {
        let _scope = test_env::scope_with(|lock| {
            vec![
                lock.set_var(BASE_LOCATION, base),
                lock.set_var(EXTENSIONS_LOCATION, "/srv/config/local"),
                lock.set_var(POLL_INTERVAL, "250"),
                lock.remove_var(PASSWORD),
            ]
        });
        let settings = ManagerSettings::from_env().expect("settings");
        assert_eq!(settings.base().map(Utf8Path::as_str), Some(base));
        assert_eq!(
            settings.extensions().map(Utf8Path::as_str),
            Some("/srv/config/local")
        );
        assert_eq!(settings.poll_interval(), Duration::from_millis(250));
        assert!(settings.decryptor().is_none());
    }

    #[rstest]
    fn reads_master_password() {
        let _scope = test_env::scope_with(|lock| {
            vec![
                lock.remove_var(BASE_LOCATION),
                lock.remove_var(EXTENSIONS_LOCATION),
                lock.remove_var(POLL_INTERVAL),
                lock.set_var(PASSWORD, "12345"),
            ]
        });
        let settings = ManagerSettings::from_env().expect("settings");
        assert_eq!(
            settings.decryptor(),
            Some(&ValueDecryptor::new("12345"))
        );
        assert_eq!(settings, ManagerSettings::new().with_password("12345"));
    }

    #[rstest]
    fn missing_and_blank_variables_are_unset() {
        let _scope = test_env::scope_with(|lock| {
            vec![
                lock.set_var(BASE_LOCATION, "   "),
                lock.remove_var(EXTENSIONS_LOCATION),
                lock.remove_var(POLL_INTERVAL),
                lock.set_var(PASSWORD, " "),
            ]
        });
        let settings = ManagerSettings::from_env().expect("settings");
        assert_eq!(settings, ManagerSettings::new());
    }

    #[rstest]
    fn non_numeric_interval_is_rejected() {
        let _scope = test_env::scope_with(|lock| {
            vec![
                lock.remove_var(BASE_LOCATION),
                lock.remove_var(EXTENSIONS_LOCATION),
                lock.set_var(POLL_INTERVAL, "soon"),
            ]
        });
        let err = ManagerSettings::from_env().expect_err("settings fail");
        assert!(matches!(&*err, KrauseningError::Settings(_)));
    }

    #[rstest]
    fn poll_interval_has_a_floor() {
        let settings = ManagerSettings::new().with_poll_interval(Duration::ZERO);
        assert_eq!(settings.poll_interval(), MIN_POLL_INTERVAL);
    }

    #[rstest]
    fn missing_directories_are_tolerated() {
        let dir = TempDir::new().expect("temp dir");
        let gone = utf8(&dir).join("gone");
        let locations = Locations::new(Some(gone.clone()), None).expect("locations");
        assert_eq!(locations.base(), Some(gone.as_path()));
        assert_eq!(locations.extensions(), None);
    }

    #[rstest]
    #[case::base(true)]
    #[case::extensions(false)]
    fn files_are_not_directories(#[case] as_base: bool) {
        let dir = TempDir::new().expect("temp dir");
        let file = utf8(&dir).join("plain.txt");
        std::fs::write(&file, "x").expect("write file");
        let result = if as_base {
            Locations::new(Some(file), None)
        } else {
            Locations::new(None, Some(file))
        };
        let err = result.expect_err("not a directory");
        let expected = if as_base { BASE_LOCATION } else { EXTENSIONS_LOCATION };
        assert!(matches!(
            &*err,
            KrauseningError::NotADirectory { variable, .. } if *variable == expected
        ));
    }
}
