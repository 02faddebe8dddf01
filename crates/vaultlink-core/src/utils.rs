//! Path resolution against the vault root.
//!
//! [`NotePath`] already guarantees a lexically contained, normalized path.
//! [`PathResolver`] joins it onto the vault root and, for paths that exist,
//! re-checks containment after symlink resolution.

use crate::error::{Error, Result};
use crate::models::NotePath;
use std::path::{Path, PathBuf};

/// Maps vault-relative paths to absolute filesystem locations
#[derive(Debug, Clone)]
pub struct PathResolver {
    root: PathBuf,
}

impl PathResolver {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Vault root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a note or folder path to its absolute location.
    ///
    /// Existence is not checked; callers decide whether the target must exist.
    pub fn resolve(&self, path: &NotePath) -> Result<PathBuf> {
        let mut full_path = self.root.clone();
        for segment in path.segments() {
            full_path.push(segment);
        }

        // Symlinks inside the vault may point elsewhere. A target that does not
        // exist yet is checked through its nearest existing ancestor.
        let canonical_root = self
            .root
            .canonicalize()
            .unwrap_or_else(|_| self.root.clone());
        let existing = full_path
            .ancestors()
            .take_while(|ancestor| ancestor.starts_with(&self.root))
            .find_map(|ancestor| ancestor.canonicalize().ok());
        if let Some(canonical) = existing
            && !canonical.starts_with(&canonical_root)
        {
            return Err(Error::path_traversal(path.as_str()));
        }

        Ok(full_path)
    }

    /// Resolve an optional folder, `None` meaning the vault root
    pub fn resolve_folder(&self, folder: Option<&NotePath>) -> Result<PathBuf> {
        match folder {
            Some(path) => self.resolve(path),
            None => Ok(self.root.clone()),
        }
    }

    /// Express an absolute path under the root as a `/`-separated relative path
    pub fn relative(&self, absolute: &Path) -> Option<String> {
        let relative = absolute.strip_prefix(&self.root).ok()?;
        let parts: Vec<String> = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        (!parts.is_empty()).then(|| parts.join("/"))
    }
}
