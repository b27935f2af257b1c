//! Temporary base/extension layer directories.
//!
//! ```
//! use test_helpers::fixtures::PropertyTree;
//!
//! # fn main() -> anyhow::Result<()> {
//! let tree = PropertyTree::new()?;
//! tree.write_base("app.properties", "greeting=hello\n")?;
//! assert!(tree.base_dir().join("app.properties").is_file());
//! # Ok(())
//! # }
//! ```

use anyhow::{Context, Result, anyhow};
use camino::{Utf8Path, Utf8PathBuf};
use tempfile::TempDir;

/// A temporary directory holding `base/` and `extensions/` layer
/// directories. Everything is deleted on drop.
#[derive(Debug)]
pub struct PropertyTree {
    _root: TempDir,
    root: Utf8PathBuf,
    base: Utf8PathBuf,
    extensions: Utf8PathBuf,
}

impl PropertyTree {
    /// Create the tree with both layer directories present and empty.
    ///
    /// # Errors
    ///
    /// Returns an error if the temporary directory cannot be created or its
    /// path is not valid UTF-8.
    pub fn new() -> Result<Self> {
        let dir = TempDir::new().context("create temporary directory")?;
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf())
            .map_err(|path| anyhow!("temporary directory is not UTF-8: {}", path.display()))?;
        let base = root.join("base");
        let extensions = root.join("extensions");
        for layer in [&base, &extensions] {
            std::fs::create_dir(layer).with_context(|| format!("create {layer}"))?;
        }
        Ok(Self {
            _root: dir,
            root,
            base,
            extensions,
        })
    }

    /// Directory containing both layers.
    #[must_use]
    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    /// Base layer directory.
    #[must_use]
    pub fn base_dir(&self) -> &Utf8Path {
        &self.base
    }

    /// Extension layer directory.
    #[must_use]
    pub fn extensions_dir(&self) -> &Utf8Path {
        &self.extensions
    }

    /// Write `contents` to `name` in the base layer.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn write_base(&self, name: &str, contents: &str) -> Result<Utf8PathBuf> {
        write(&self.base, name, contents)
    }

    /// Write `contents` to `name` in the extension layer.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn write_extension(&self, name: &str, contents: &str) -> Result<Utf8PathBuf> {
        write(&self.extensions, name, contents)
    }

    /// Delete `name` from the extension layer.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be removed.
    pub fn remove_extension(&self, name: &str) -> Result<()> {
        let path = self.extensions.join(name);
        std::fs::remove_file(&path).with_context(|| format!("remove {path}"))
    }
}

fn write(dir: &Utf8Path, name: &str, contents: &str) -> Result<Utf8PathBuf> {
    let path = dir.join(name);
    std::fs::write(&path, contents).with_context(|| format!("write {path}"))?;
    Ok(path)
}
