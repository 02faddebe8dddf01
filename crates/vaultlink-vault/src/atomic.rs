//! Crash-safe note writes.
//!
//! Content goes to a sibling `<path>.tmp` file first and is then renamed over
//! the target. Readers see either the old content or the complete new content,
//! never a partial write. A failed commit removes its temp file (best effort)
//! and leaves the target untouched. With syncing on, the temp file and then
//! the parent directory are fsynced so a commit survives power loss.

use std::ffi::OsString;
use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use vaultlink_core::{Error, Result};

/// Atomic write-then-rename committer
#[derive(Debug, Clone)]
pub struct DurableWriter {
    /// fsync the temp file before the rename and the directory after it
    sync: bool,
}

impl Default for DurableWriter {
    fn default() -> Self {
        Self { sync: true }
    }
}

impl DurableWriter {
    pub fn new(sync: bool) -> Self {
        Self { sync }
    }

    /// Replace the content of `path` atomically
    pub async fn commit(&self, path: &Path, content: &str) -> Result<()> {
        let bytes = content.as_bytes().to_vec();
        let sync = self.sync;
        self.commit_with(path, move |temp| async move {
            write_temp(&temp, &bytes, sync).await
        })
        .await
    }

    /// Commit using a custom temp-file writer
    async fn commit_with<F, Fut>(&self, path: &Path, write: F) -> Result<()>
    where
        F: FnOnce(PathBuf) -> Fut,
        Fut: Future<Output = io::Result<()>>,
    {
        let temp = temp_path(path);

        if let Err(e) = write(temp.clone()).await {
            discard(&temp).await;
            return Err(Error::write_error(path, e));
        }

        if let Err(e) = fs::rename(&temp, path).await {
            discard(&temp).await;
            return Err(Error::write_error(path, e));
        }

        // The new content is in place; only the rename's durability is at stake
        if self.sync
            && let Err(e) = sync_parent(path).await
        {
            log::warn!("Could not sync directory of {}: {}", path.display(), e);
        }

        log::debug!("Committed {}", path.display());
        Ok(())
    }
}

/// Sibling temp file: `note.md` becomes `note.md.tmp`
pub fn temp_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".tmp");
    PathBuf::from(name)
}

async fn write_temp(temp: &Path, bytes: &[u8], sync: bool) -> io::Result<()> {
    let mut file = fs::File::create(temp).await?;
    file.write_all(bytes).await?;
    file.flush().await?;
    if sync {
        file.sync_all().await?;
    }
    Ok(())
}

/// fsync the directory holding `path` so the rename survives power loss
#[cfg(unix)]
async fn sync_parent(path: &Path) -> io::Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            fs::File::open(parent).await?.sync_all().await
        }
        _ => Ok(()),
    }
}

#[cfg(not(unix))]
async fn sync_parent(_path: &Path) -> io::Result<()> {
    Ok(())
}

async fn discard(temp: &Path) {
    if let Err(e) = fs::remove_file(temp).await
        && e.kind() != io::ErrorKind::NotFound
    {
        log::warn!("Could not remove temp file {}: {}", temp.display(), e);
    }
}
