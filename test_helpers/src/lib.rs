//! Test helpers shared across crates in the krausening workspace.
//!
//! - [`env`]: serialised, self-restoring environment variable mutation.
//! - [`fixtures`]: temporary base/extension directory trees.

pub mod env;
pub mod fixtures;
