//! Primary error enum for property loading flows.

use camino::Utf8PathBuf;
use figment::Error as FigmentError;
use thiserror::Error;

/// Errors that can occur while loading properties.
///
/// Missing layers and unknown keys are not errors: a missing base or
/// extension file is an empty layer, and an unknown key resolves to `None`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum KrauseningError {
    /// A properties file or layer directory could not be read.
    #[error("Failed to read '{path}': {source}")]
    Read {
        /// Path that triggered the failure.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A properties file contained a malformed entry.
    #[error("Malformed properties file '{path}' at line {line}: {message}")]
    Parse {
        /// File being parsed.
        path: Utf8PathBuf,
        /// One-based line on which the offending logical line starts.
        line: usize,
        /// Human-readable description of the problem.
        message: String,
    },

    /// A configured location exists but is not a directory.
    #[error("{variable} refers to '{path}', which is not a directory")]
    NotADirectory {
        /// Setting that named the location.
        variable: &'static str,
        /// Offending path.
        path: Utf8PathBuf,
    },

    /// A properties file name that cannot name a file inside a layer directory.
    #[error("Invalid properties file name '{name}': {reason}")]
    InvalidFileName {
        /// Rejected file name.
        name: String,
        /// Why the name was rejected.
        reason: &'static str,
    },

    /// An `ENC(...)` value could not be decrypted with the master password.
    #[error("Failed to decrypt '{key}' in '{file_name}': {reason}")]
    Decrypt {
        /// Properties file holding the value.
        file_name: String,
        /// Key whose value failed to decrypt.
        key: String,
        /// Why decryption failed.
        reason: String,
    },

    /// The layer directories could not be watched for changes.
    #[error("Failed to watch properties directories: {0}")]
    Watch(#[from] Box<notify::Error>),

    /// The manager settings could not be extracted from the environment.
    #[error("Failed to read manager settings: {0}")]
    Settings(#[from] Box<FigmentError>),
}

impl KrauseningError {
    /// Construct a [`KrauseningError::Read`] for `path`.
    #[must_use]
    pub fn read(path: impl Into<Utf8PathBuf>, source: std::io::Error) -> Self {
        Self::Read {
            path: path.into(),
            source,
        }
    }

    /// Construct a [`KrauseningError::Parse`] for `path` at `line`.
    #[must_use]
    pub fn parse(path: impl Into<Utf8PathBuf>, line: usize, message: impl Into<String>) -> Self {
        Self::Parse {
            path: path.into(),
            line,
            message: message.into(),
        }
    }

    /// Returns `true` when the error came from reading the filesystem.
    #[must_use]
    pub const fn is_io(&self) -> bool {
        matches!(self, Self::Read { .. })
    }
}

impl From<notify::Error> for KrauseningError {
    fn from(err: notify::Error) -> Self {
        Self::Watch(Box::new(err))
    }
}

impl From<FigmentError> for KrauseningError {
    fn from(err: FigmentError) -> Self {
        Self::Settings(Box::new(err))
    }
}
