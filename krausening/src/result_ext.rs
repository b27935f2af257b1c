//! Extensions for mapping errors to `KrauseningResult` concisely.
//!
//! These helpers reduce repetitive `.map_err(|e| Arc::new(…))` patterns when
//! converting I/O failures into the crate's `KrauseningResult<T>` alias
//! (`Result<T, Arc<KrauseningError>>`).

use crate::{KrauseningError, KrauseningResult};
use camino::Utf8Path;
use std::sync::Arc;

/// Generic extension for mapping any `Result<T, E>` with
/// `E: Into<KrauseningError>` into a `KrauseningResult<T>`.
pub trait KrauseningResultExt<T, E> {
    /// Convert `Result<T, E>` into `KrauseningResult<T>` using
    /// `Into<KrauseningError>`.
    ///
    /// # Errors
    ///
    /// Propagates the original error after conversion into
    /// `Arc<KrauseningError>`.
    fn into_krausening(self) -> KrauseningResult<T>;
}

impl<T, E> KrauseningResultExt<T, E> for Result<T, E>
where
    E: Into<KrauseningError>,
{
    fn into_krausening(self) -> KrauseningResult<T> {
        self.map_err(|e| Arc::new(e.into()))
    }
}

/// Extension attaching a path to `std::io::Error` results.
pub trait IoResultExt<T> {
    /// Convert an I/O result into a [`KrauseningError::Read`] for `path`.
    ///
    /// # Errors
    ///
    /// Returns a `KrauseningError::Read` wrapped in `Arc` when the input is
    /// `Err`.
    fn for_path(self, path: &Utf8Path) -> KrauseningResult<T>;
}

impl<T> IoResultExt<T> for std::io::Result<T> {
    fn for_path(self, path: &Utf8Path) -> KrauseningResult<T> {
        self.map_err(|e| Arc::new(KrauseningError::read(path, e)))
    }
}
