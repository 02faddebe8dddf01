//! Per-note write serialization.
//!
//! Mutations of the same note within one process run one at a time, so an
//! edit never patches content another in-flight write is about to replace.
//! Folder moves and deletes take the whole tree exclusively, so no note write
//! runs inside a folder while it is being moved or removed.
//! Writers in other processes are not covered: the last rename wins.

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard, OwnedRwLockReadGuard, OwnedRwLockWriteGuard, RwLock};
use vaultlink_core::NotePath;

type Registry = DashMap<NotePath, Arc<Mutex<()>>>;

/// Lock registry keyed by normalized note path.
///
/// Entries exist only while a note is locked or awaited.
#[derive(Debug, Clone, Default)]
pub struct NoteLocks {
    inner: Arc<Registry>,
    tree: Arc<RwLock<()>>,
}

/// Held while one or more notes are being mutated
#[derive(Debug)]
pub struct NoteGuard {
    notes: Vec<PathGuard>,
    _tree: OwnedRwLockReadGuard<()>,
}

impl NoteGuard {
    /// Number of distinct notes held
    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }
}

/// Exclusive hold on the whole vault tree
pub type TreeGuard = OwnedRwLockWriteGuard<()>;

#[derive(Debug)]
struct PathGuard {
    guard: Option<OwnedMutexGuard<()>>,
    path: NotePath,
    registry: Arc<Registry>,
}

impl Drop for PathGuard {
    fn drop(&mut self) {
        drop(self.guard.take());
        // Only the registry's own reference left: nobody holds or awaits it
        self.registry
            .remove_if(&self.path, |_, mutex| Arc::strong_count(mutex) == 1);
    }
}

impl NoteLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `path`
    pub async fn lock(&self, path: &NotePath) -> NoteGuard {
        self.lock_all(&[path]).await
    }

    /// Lock several paths at once.
    ///
    /// Paths are locked in sorted order with duplicates removed, so two
    /// callers locking overlapping sets cannot deadlock.
    pub async fn lock_all(&self, paths: &[&NotePath]) -> NoteGuard {
        let tree = Arc::clone(&self.tree).read_owned().await;

        let mut ordered: Vec<&NotePath> = paths.to_vec();
        ordered.sort();
        ordered.dedup();

        let mut notes = Vec::with_capacity(ordered.len());
        for path in ordered {
            notes.push(self.lock_path(path).await);
        }
        NoteGuard { notes, _tree: tree }
    }

    /// Wait until no note is locked, then block every note lock until the
    /// guard is dropped
    pub async fn lock_tree(&self) -> TreeGuard {
        Arc::clone(&self.tree).write_owned().await
    }

    async fn lock_path(&self, path: &NotePath) -> PathGuard {
        // Clone the mutex out so the map shard is not held across the await
        let mutex = self.inner.entry(path.clone()).or_default().clone();
        PathGuard {
            guard: Some(mutex.lock_owned().await),
            path: path.clone(),
            registry: Arc::clone(&self.inner),
        }
    }

    /// Number of notes currently locked or awaited
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}
