//! Removal of directories left empty by deletes and moves.

use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Walks upward from a removed entry, deleting empty directories until it
/// reaches the vault root or a directory that still has entries.
///
/// The root itself is never removed. Pruning is best effort: failures are
/// logged and stop the walk without failing the caller's operation.
#[derive(Debug, Clone)]
pub struct DirectoryPruner {
    root: PathBuf,
}

impl DirectoryPruner {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Prune starting at the parent of a removed file or folder.
    ///
    /// Returns how many directories were removed.
    pub async fn prune_from(&self, removed: &Path) -> usize {
        match removed.parent() {
            Some(parent) => self.prune_dir(parent).await,
            None => 0,
        }
    }

    /// Prune starting at `dir` itself
    pub async fn prune_dir(&self, dir: &Path) -> usize {
        let mut removed = 0;
        let mut current = dir.to_path_buf();

        while current != self.root && current.starts_with(&self.root) {
            match is_empty_dir(&current).await {
                Ok(true) => {}
                Ok(false) => break,
                Err(e) => {
                    if e.kind() != io::ErrorKind::NotFound {
                        log::warn!("Could not inspect {}: {}", current.display(), e);
                    }
                    break;
                }
            }

            if let Err(e) = fs::remove_dir(&current).await {
                log::warn!("Could not remove empty directory {}: {}", current.display(), e);
                break;
            }
            log::debug!("Removed empty directory {}", current.display());
            removed += 1;

            match current.parent() {
                Some(parent) => current = parent.to_path_buf(),
                None => break,
            }
        }

        removed
    }
}

async fn is_empty_dir(dir: &Path) -> io::Result<bool> {
    let mut entries = fs::read_dir(dir).await?;
    Ok(entries.next_entry().await?.is_none())
}
