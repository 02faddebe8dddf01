//! Filesystem implementation of every vault operation

use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::instrument;
use vaultlink_core::prelude::*;

use crate::atomic::DurableWriter;
use crate::edit::{EditEngine, PatchPlan};
use crate::prune::DirectoryPruner;

/// Direct access to the vault directory.
///
/// Every path is a [`NotePath`] resolved against the vault root. Writes go
/// through [`DurableWriter`]; deletes and moves prune the directories they
/// leave empty.
#[derive(Debug, Clone)]
pub struct FilesystemVault {
    config: VaultConfig,
    resolver: PathResolver,
    writer: DurableWriter,
    pruner: DirectoryPruner,
    engine: EditEngine,
}

impl FilesystemVault {
    /// Create a filesystem vault from server configuration
    pub fn new(config: &ServerConfig) -> Self {
        let root = config.vault_root().to_path_buf();
        Self {
            config: config.vault.clone(),
            resolver: PathResolver::new(root.clone()),
            writer: DurableWriter::new(config.sync_writes),
            pruner: DirectoryPruner::new(root),
            engine: EditEngine::new(),
        }
    }

    /// Vault root directory
    pub fn root(&self) -> &Path {
        self.resolver.root()
    }

    /// Edit engine shared with the remote edit flow
    pub fn engine(&self) -> &EditEngine {
        &self.engine
    }

    /// Absolute location of a note or folder
    pub fn resolve_path(&self, path: &NotePath) -> Result<PathBuf> {
        self.resolver.resolve(path)
    }

    /// List notes below `folder` (the whole vault for `None`), sorted
    #[instrument(skip(self), fields(folder = ?folder.map(NotePath::as_str)), name = "fs_list_notes")]
    pub async fn list_notes(&self, folder: Option<&NotePath>) -> Result<Vec<String>> {
        let start = self.resolver.resolve_folder(folder)?;
        if !fs::metadata(&start)
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false)
        {
            return Err(Error::not_found(
                folder.map(NotePath::as_str).unwrap_or_default(),
            ));
        }

        let mut notes = Vec::new();
        let mut stack = vec![start];

        while let Some(dir) = stack.pop() {
            let mut entries = fs::read_dir(&dir).await.map_err(Error::io)?;

            while let Some(entry) = entries.next_entry().await.map_err(Error::io)? {
                let name = entry.file_name();
                let Some(name) = name.to_str() else {
                    log::debug!("Skipping non-UTF-8 entry in {}", dir.display());
                    continue;
                };

                if self.config.is_excluded(name) {
                    continue;
                }

                let file_type = entry.file_type().await.map_err(Error::io)?;
                let path = entry.path();
                if file_type.is_dir() {
                    stack.push(path);
                } else if file_type.is_file()
                    && self.config.is_note(name)
                    && let Some(relative) = self.resolver.relative(&path)
                {
                    notes.push(relative);
                }
            }
        }

        notes.sort();
        log::debug!("Listed {} notes", notes.len());
        Ok(notes)
    }

    /// Read a note as UTF-8 text
    #[instrument(skip(self), fields(note = %path), name = "fs_read_note")]
    pub async fn read_note(&self, path: &NotePath) -> Result<String> {
        let full_path = self.resolver.resolve(path)?;
        fs::read_to_string(&full_path)
            .await
            .map_err(|e| Error::from_io_at(e, path.as_str()))
    }

    /// Read several notes; failures are reported per path
    pub async fn read_multiple_notes(&self, paths: &[NotePath]) -> Vec<NoteReadResult> {
        let mut results = Vec::with_capacity(paths.len());
        for path in paths {
            results.push(match self.read_note(path).await {
                Ok(content) => NoteReadResult::ok(path, content),
                Err(e) => {
                    log::debug!("Could not read {}: {}", path, e);
                    NoteReadResult::failed(path, &e)
                }
            });
        }
        results
    }

    /// Create a note, creating parent folders as needed.
    ///
    /// An existing note at `path` is overwritten.
    #[instrument(skip(self, content), fields(note = %path, size = content.len()), name = "fs_create_note")]
    pub async fn create_note(&self, path: &NotePath, content: &str) -> Result<()> {
        let full_path = self.resolver.resolve(path)?;
        ensure_parent(&full_path).await?;
        self.writer.commit(&full_path, content).await?;
        log::info!("Created note {}", path);
        Ok(())
    }

    /// Replace the content of an existing note
    #[instrument(skip(self, content), fields(note = %path, size = content.len()), name = "fs_update_note")]
    pub async fn update_note(&self, path: &NotePath, content: &str) -> Result<()> {
        let full_path = self.resolver.resolve(path)?;
        self.require_file(path, &full_path).await?;
        self.writer.commit(&full_path, content).await?;
        log::info!("Updated note {}", path);
        Ok(())
    }

    /// Apply an edit batch to a note.
    ///
    /// With `dry_run` the note is left untouched and a diff is returned.
    /// `expected_hash`, when given, must match the note's current content.
    #[instrument(skip(self, edits, expected_hash), fields(note = %path, edits = edits.len()), name = "fs_edit_note")]
    pub async fn edit_note(
        &self,
        path: &NotePath,
        edits: &[EditOperation],
        dry_run: bool,
        expected_hash: Option<&str>,
    ) -> Result<PatchResult> {
        let full_path = self.resolver.resolve(path)?;
        let current = fs::read_to_string(&full_path)
            .await
            .map_err(|e| Error::from_io_at(e, path.as_str()))?;

        let plan = self
            .engine
            .plan(path.as_str(), &current, edits, dry_run, expected_hash)?;

        if let PatchPlan::Commit { content, .. } = &plan {
            self.writer.commit(&full_path, content).await?;
            log::info!("Applied {} edits to {}", edits.len(), path);
        }

        Ok(plan.into_result())
    }

    /// Delete a note and prune the folders it leaves empty
    #[instrument(skip(self), fields(note = %path), name = "fs_delete_note")]
    pub async fn delete_note(&self, path: &NotePath) -> Result<()> {
        let full_path = self.resolver.resolve(path)?;
        self.require_file(path, &full_path).await?;
        fs::remove_file(&full_path)
            .await
            .map_err(|e| Error::from_io_at(e, path.as_str()))?;

        self.pruner.prune_from(&full_path).await;
        log::info!("Deleted note {}", path);
        Ok(())
    }

    /// Move a note; the destination must not exist
    #[instrument(skip(self), fields(from = %source, to = %destination), name = "fs_move_note")]
    pub async fn move_note(&self, source: &NotePath, destination: &NotePath) -> Result<()> {
        let from = self.resolver.resolve(source)?;
        let to = self.resolver.resolve(destination)?;

        self.require_file(source, &from).await?;
        self.require_absent(destination, &to).await?;
        ensure_parent(&to).await?;

        fs::rename(&from, &to).await.map_err(Error::io)?;
        self.pruner.prune_from(&from).await;
        log::info!("Moved note {} to {}", source, destination);
        Ok(())
    }

    /// Create a folder and any missing parents; existing folders are fine
    #[instrument(skip(self), fields(folder = %path), name = "fs_create_folder")]
    pub async fn create_folder(&self, path: &NotePath) -> Result<()> {
        let full_path = self.resolver.resolve(path)?;
        if let Ok(meta) = fs::metadata(&full_path).await
            && !meta.is_dir()
        {
            return Err(Error::already_exists(path.as_str()));
        }

        fs::create_dir_all(&full_path).await.map_err(Error::io)?;
        log::info!("Created folder {}", path);
        Ok(())
    }

    /// Rename or move a folder with everything in it
    #[instrument(skip(self), fields(from = %source, to = %destination), name = "fs_rename_folder")]
    pub async fn rename_folder(&self, source: &NotePath, destination: &NotePath) -> Result<()> {
        if destination.starts_with(source) {
            return Err(Error::validation_error(format!(
                "Cannot move folder {} into itself ({})",
                source, destination
            )));
        }

        let from = self.resolver.resolve(source)?;
        let to = self.resolver.resolve(destination)?;

        self.require_dir(source, &from).await?;
        self.require_absent(destination, &to).await?;
        ensure_parent(&to).await?;

        fs::rename(&from, &to).await.map_err(Error::io)?;
        self.pruner.prune_from(&from).await;
        log::info!("Moved folder {} to {}", source, destination);
        Ok(())
    }

    /// Delete a folder recursively, then prune its empty parents
    #[instrument(skip(self), fields(folder = %path), name = "fs_delete_folder")]
    pub async fn delete_folder(&self, path: &NotePath) -> Result<()> {
        let full_path = self.resolver.resolve(path)?;
        self.require_dir(path, &full_path).await?;

        let removed = remove_tree(&full_path).await?;
        self.pruner.prune_from(&full_path).await;
        log::info!("Deleted folder {} ({} files)", path, removed);
        Ok(())
    }

    /// Case-insensitive substring search over every note
    #[instrument(skip(self), name = "fs_search")]
    pub async fn search(&self, query: &str) -> Result<Vec<SearchHit>> {
        if query.trim().is_empty() {
            return Err(Error::validation_error("Search query cannot be empty"));
        }
        let needle = query.to_lowercase();

        let mut hits = Vec::new();
        for relative in self.list_notes(None).await? {
            let path = NotePath::parse(&relative)?;
            let content = match self.read_note(&path).await {
                Ok(content) => content,
                Err(e) => {
                    log::warn!("Skipping {} during search: {}", relative, e);
                    continue;
                }
            };

            if !content.to_lowercase().contains(&needle) {
                continue;
            }

            // -1 when the query only matches across a line break
            let line = content
                .lines()
                .position(|l| l.to_lowercase().contains(&needle))
                .map(|i| i as i64)
                .unwrap_or(-1);

            hits.push(SearchHit {
                path: relative,
                score: 1.0,
                matches: vec![SearchMatch { line }],
            });
        }

        log::debug!("Search for {:?} matched {} notes", query, hits.len());
        Ok(hits)
    }

    /// Durably replace the content at `path`; the parent folder must exist
    #[instrument(skip(self, content), fields(note = %path, size = content.len()), name = "fs_commit_write")]
    pub async fn commit_write(&self, path: &NotePath, content: &str) -> Result<()> {
        let full_path = self.resolver.resolve(path)?;
        self.writer.commit(&full_path, content).await
    }

    /// Remove folders left empty above `path`; returns how many were removed
    pub async fn prune_empty_dirs(&self, path: &NotePath) -> usize {
        match self.resolver.resolve(path) {
            Ok(full_path) => self.pruner.prune_from(&full_path).await,
            Err(e) => {
                log::warn!("Not pruning above {}: {}", path, e);
                0
            }
        }
    }

    async fn require_file(&self, path: &NotePath, full_path: &Path) -> Result<()> {
        match fs::metadata(full_path).await {
            Ok(meta) if meta.is_file() => Ok(()),
            Ok(_) => Err(Error::validation_error(format!("{} is a folder, not a note", path))),
            Err(e) => Err(Error::from_io_at(e, path.as_str())),
        }
    }

    async fn require_dir(&self, path: &NotePath, full_path: &Path) -> Result<()> {
        match fs::metadata(full_path).await {
            Ok(meta) if meta.is_dir() => Ok(()),
            Ok(_) => Err(Error::validation_error(format!("{} is a note, not a folder", path))),
            Err(e) => Err(Error::from_io_at(e, path.as_str())),
        }
    }

    async fn require_absent(&self, path: &NotePath, full_path: &Path) -> Result<()> {
        match fs::symlink_metadata(full_path).await {
            Ok(_) => Err(Error::already_exists(path.as_str())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::io(e)),
        }
    }
}

async fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await.map_err(Error::io)?;
    }
    Ok(())
}

/// Remove a directory tree without recursion; returns the number of files removed
async fn remove_tree(root: &Path) -> Result<usize> {
    let mut files = 0;
    let mut dirs = Vec::new();
    let mut stack = vec![root.to_path_buf()];

    while let Some(dir) = stack.pop() {
        let mut entries = fs::read_dir(&dir).await.map_err(Error::io)?;
        while let Some(entry) = entries.next_entry().await.map_err(Error::io)? {
            let path = entry.path();
            if entry.file_type().await.map_err(Error::io)?.is_dir() {
                stack.push(path);
            } else {
                fs::remove_file(&path).await.map_err(Error::io)?;
                files += 1;
            }
        }
        dirs.push(dir);
    }

    // Children were discovered after their parents
    for dir in dirs.iter().rev() {
        fs::remove_dir(dir).await.map_err(Error::io)?;
    }

    Ok(files)
}
