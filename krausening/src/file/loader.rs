//! Loading one properties file from one layer directory.

use camino::{Utf8Path, Utf8PathBuf};
use std::io;
use std::sync::Arc;
use std::time::Instant;

use super::parser::parse_properties;
use super::RawProperties;
use crate::result_ext::IoResultExt;
use crate::{KrauseningError, KrauseningResult};

/// File suffix of the files managed in a layer directory.
pub const PROPERTIES_SUFFIX: &str = ".properties";

/// The outcome of reading one file name from one layer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoadedLayer {
    /// Parsed entries; empty when the layer or file is absent.
    pub properties: RawProperties,
    /// Path of the file the entries were read from, if it existed.
    pub source: Option<Utf8PathBuf>,
}

impl LoadedLayer {
    /// A layer with no configured directory.
    #[must_use]
    pub const fn unset() -> Self {
        Self {
            properties: RawProperties::new(),
            source: None,
        }
    }
}

/// Reject names that cannot denote a file directly inside a layer directory.
///
/// # Errors
///
/// Returns [`KrauseningError::InvalidFileName`] for empty names, `.`/`..`,
/// and names containing path separators or NUL.
pub fn validate_file_name(file_name: &str) -> KrauseningResult<()> {
    let reason = if file_name.is_empty() {
        "must not be empty"
    } else if matches!(file_name, "." | "..") {
        "must not refer to a directory"
    } else if file_name.contains(['/', '\\']) {
        "must not contain path separators"
    } else if file_name.contains('\0') {
        "must not contain NUL"
    } else {
        return Ok(());
    };
    Err(Arc::new(KrauseningError::InvalidFileName {
        name: file_name.to_owned(),
        reason,
    }))
}

/// Read `file_name` from `directory`.
///
/// An unset directory or a missing file is not an error: the result is an
/// empty layer without a source. Only `.properties` files are
/// managed; any other name loads as an unset layer without touching disk.
///
/// # Errors
///
/// Returns an error when the name is invalid, or when the file exists but
/// cannot be read or parsed.
pub fn load(directory: Option<&Utf8Path>, file_name: &str) -> KrauseningResult<LoadedLayer> {
    validate_file_name(file_name)?;
    let Some(dir) = directory else {
        return Ok(LoadedLayer::unset());
    };
    if !file_name.ends_with(PROPERTIES_SUFFIX) {
        tracing::debug!(file = file_name, "not a properties file; skipped");
        return Ok(LoadedLayer::unset());
    }
    let path = dir.join(file_name);
    let started = Instant::now();
    let data = match std::fs::read_to_string(&path) {
        Ok(data) => data,
        Err(err) if matches!(err.kind(), io::ErrorKind::NotFound | io::ErrorKind::IsADirectory) => {
            tracing::trace!(path = %path, "layer file absent");
            return Ok(LoadedLayer::unset());
        }
        Err(err) => return Err(Arc::new(KrauseningError::read(path, err))),
    };
    let properties = parse_properties(&path, &data)?;
    tracing::debug!(
        path = %path,
        entries = properties.len(),
        elapsed = ?started.elapsed(),
        "loaded properties file"
    );
    Ok(LoadedLayer {
        properties,
        source: Some(path),
    })
}

/// List the `.properties` file names directly inside `directory`, sorted.
///
/// Other files, subdirectories and names that are not valid UTF-8 are
/// skipped. A directory that does not exist lists as empty.
///
/// # Errors
///
/// Returns [`KrauseningError::Read`] when the directory cannot be listed.
pub fn list_property_files(directory: &Utf8Path) -> KrauseningResult<Vec<String>> {
    let entries = match std::fs::read_dir(directory) {
        Ok(entries) => entries,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(err) => return Err(Arc::new(KrauseningError::read(directory, err))),
    };
    let mut names = Vec::new();
    for entry in entries {
        let entry = entry.for_path(directory)?;
        let Ok(path) = Utf8PathBuf::from_path_buf(entry.path()) else {
            continue;
        };
        let Some(name) = path.file_name() else {
            continue;
        };
        if name.ends_with(PROPERTIES_SUFFIX) && path.is_file() {
            names.push(name.to_owned());
        }
    }
    names.sort();
    if names.is_empty() {
        tracing::warn!(directory = %directory, "no properties files found");
    }
    Ok(names)
}
