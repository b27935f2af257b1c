//! Error types produced while loading and resolving properties.

mod types;

pub use types::KrauseningError;
