//! Externalised, layered properties files.
//!
//! Krausening keeps properties files outside the deployable artefact. A
//! **base** directory (`KRAUSENING_BASE`) holds the standard configuration
//! and an optional **extension** directory (`KRAUSENING_EXTENSIONS`) holds
//! per-deployment overrides. For each file name the two layers are merged,
//! extension over base, and any key missing from both falls back to the
//! environment variable of the same name.
//!
//! Merged sets are cached per file name and watched: when a layer file
//! changes on disk the cache publishes a freshly built set. Sets are
//! immutable, so a caller holding one always sees a consistent snapshot.
//!
//! ```no_run
//! use krausening::PropertyManager;
//!
//! # fn main() -> krausening::KrauseningResult<()> {
//! let props = PropertyManager::get_instance()?.get_properties("example.properties")?;
//! if let Some(url) = props.get("database.url") {
//!     println!("connecting to {url}");
//! }
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

mod cache;
mod crypto;
mod environment;
mod error;
pub mod file;
mod manager;
mod properties;
mod resolver;
mod result_ext;
pub mod settings;
mod watcher;

pub use cache::PropertyCache;
pub use crypto::ValueDecryptor;
pub use environment::{Environment, FixedEnvironment, ProcessEnvironment};
pub use error::KrauseningError;
pub use file::{LoadedLayer, RawProperties};
pub use manager::PropertyManager;
pub use properties::PropertySet;
pub use resolver::Resolver;
pub use result_ext::{IoResultExt, KrauseningResultExt};
pub use settings::{Locations, ManagerSettings};
pub use watcher::Watcher;

/// Result type used throughout the crate.
///
/// Errors are shared so that every caller waiting on the same load can
/// receive the same failure.
pub type KrauseningResult<T> = Result<T, Arc<KrauseningError>>;
