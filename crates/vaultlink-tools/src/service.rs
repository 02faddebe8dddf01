//! Backend selection for every vault operation.
//!
//! [`VaultService`] tries the remote API first and falls back to the local
//! filesystem when the API is unavailable. With the API disabled (offline
//! profile) operations go straight to the filesystem. Mutations of the same
//! note are serialized through [`NoteLocks`]; folder moves and deletes hold
//! the whole tree.

use std::future::Future;
use std::sync::Arc;
use tracing::instrument;
use vaultlink_core::prelude::*;
use vaultlink_core::{local_only, with_fallback};
use vaultlink_remote::{HttpVaultApi, VaultApi};
use vaultlink_vault::{FilesystemVault, NoteLocks, PatchPlan};

use crate::operations::{OperationOutput, VaultOperation};

/// Dispatches vault operations API-first with filesystem fallback
#[derive(Clone)]
pub struct VaultService {
    api: Option<Arc<dyn VaultApi>>,
    fs: FilesystemVault,
    locks: NoteLocks,
}

impl VaultService {
    /// Build from configuration, connecting the HTTP API when enabled
    pub fn new(config: &ServerConfig) -> Result<Self> {
        let api: Option<Arc<dyn VaultApi>> = if config.api.enabled {
            Some(Arc::new(HttpVaultApi::new(&config.api)?))
        } else {
            log::info!("Remote API disabled, using the vault directory only");
            None
        };

        Ok(Self {
            api,
            fs: FilesystemVault::new(config),
            locks: NoteLocks::new(),
        })
    }

    /// Build with a caller-supplied API implementation
    pub fn with_api(config: &ServerConfig, api: Arc<dyn VaultApi>) -> Self {
        Self {
            api: Some(api),
            fs: FilesystemVault::new(config),
            locks: NoteLocks::new(),
        }
    }

    /// Build without a remote API
    pub fn offline(config: &ServerConfig) -> Self {
        Self {
            api: None,
            fs: FilesystemVault::new(config),
            locks: NoteLocks::new(),
        }
    }

    /// Local filesystem backend
    pub fn filesystem(&self) -> &FilesystemVault {
        &self.fs
    }

    pub fn has_api(&self) -> bool {
        self.api.is_some()
    }

    /// Execute one operation, reporting which backend served it
    #[instrument(skip(self, op), fields(tool = op.name()), name = "vault_execute")]
    pub async fn execute(&self, op: VaultOperation) -> Result<BackendOutcome<OperationOutput>> {
        let outcome = match op {
            VaultOperation::ListNotes { folder } => self
                .list_notes(folder.as_ref())
                .await?
                .map(OperationOutput::Notes),
            VaultOperation::ReadNote { path } => {
                self.read_note(&path).await?.map(OperationOutput::Content)
            }
            VaultOperation::ReadMultipleNotes { paths } => self
                .read_multiple_notes(&paths)
                .await
                .map(OperationOutput::Contents),
            VaultOperation::CreateNote { path, content } => self
                .create_note(&path, &content)
                .await?
                .map(|()| message(format!("Note created successfully at {}", path))),
            VaultOperation::UpdateNote { path, content } => self
                .update_note(&path, &content)
                .await?
                .map(|()| message(format!("Note updated successfully at {}", path))),
            VaultOperation::EditNote {
                path,
                edits,
                dry_run,
                expected_hash,
            } => self
                .edit_note(&path, &edits, dry_run, expected_hash.as_deref())
                .await?
                .map(OperationOutput::Patch),
            VaultOperation::SearchVault { query } => self
                .search_vault(&query)
                .await?
                .map(OperationOutput::SearchResults),
            VaultOperation::DeleteNote { path } => self
                .delete_note(&path)
                .await?
                .map(|()| message(format!("Note deleted successfully: {}", path))),
            VaultOperation::MoveNote {
                source,
                destination,
            } => self.move_note(&source, &destination).await?.map(|()| {
                message(format!(
                    "Note moved successfully from {} to {}",
                    source, destination
                ))
            }),
            VaultOperation::CreateFolder { path } => self
                .create_folder(&path)
                .await?
                .map(|()| message(format!("Folder created successfully at {}", path))),
            VaultOperation::RenameFolder { path, new_path } => self
                .rename_folder(&path, &new_path)
                .await?
                .map(|()| message(format!("Folder renamed from {} to {}", path, new_path))),
            VaultOperation::MoveFolder { path, new_path } => self
                .rename_folder(&path, &new_path)
                .await?
                .map(|()| message(format!("Folder moved from {} to {}", path, new_path))),
            VaultOperation::DeleteFolder { path } => self
                .delete_folder(&path)
                .await?
                .map(|()| message(format!("Folder deleted successfully: {}", path))),
        };

        log::debug!("Served by {}", outcome.backend());
        Ok(outcome)
    }

    pub async fn list_notes(&self, folder: Option<&NotePath>) -> Result<BackendOutcome<Vec<String>>> {
        self.run(
            "list_notes",
            |api| async move {
                let notes = api.list_notes().await?;
                Ok(match folder {
                    Some(folder) => notes
                        .into_iter()
                        .filter(|note| in_folder(note, folder))
                        .collect(),
                    None => notes,
                })
            },
            || self.fs.list_notes(folder),
        )
        .await
    }

    pub async fn read_note(&self, path: &NotePath) -> Result<BackendOutcome<String>> {
        self.run(
            "read_note",
            |api| async move { api.read_note(path).await },
            || self.fs.read_note(path),
        )
        .await
    }

    /// Read each path independently; failures are reported inline.
    ///
    /// The batch counts as served by the API only if every read was.
    pub async fn read_multiple_notes(&self, paths: &[NotePath]) -> BackendOutcome<Vec<NoteReadResult>> {
        let mut results = Vec::with_capacity(paths.len());
        let mut all_remote = self.api.is_some();

        for path in paths {
            match self.read_note(path).await {
                Ok(outcome) => {
                    all_remote &= outcome.backend() == Backend::Api;
                    results.push(NoteReadResult::ok(path, outcome.into_inner()));
                }
                Err(e) => {
                    all_remote = false;
                    results.push(NoteReadResult::failed(path, &e));
                }
            }
        }

        if all_remote {
            BackendOutcome::Api(results)
        } else {
            BackendOutcome::Filesystem(results)
        }
    }

    pub async fn create_note(&self, path: &NotePath, content: &str) -> Result<BackendOutcome<()>> {
        let _guard = self.locks.lock(path).await;
        self.run(
            "create_note",
            |api| async move { api.create_note(path, content).await },
            || self.fs.create_note(path, content),
        )
        .await
    }

    pub async fn update_note(&self, path: &NotePath, content: &str) -> Result<BackendOutcome<()>> {
        let _guard = self.locks.lock(path).await;
        self.run(
            "update_note",
            |api| async move { api.update_note(path, content).await },
            || self.fs.update_note(path, content),
        )
        .await
    }

    /// Patch a note through whichever backend is reachable.
    ///
    /// Over the API the note is fetched, patched in memory and written back.
    /// A missing edit target or a hash conflict is reported as-is and never
    /// retried against the filesystem.
    pub async fn edit_note(
        &self,
        path: &NotePath,
        edits: &[EditOperation],
        dry_run: bool,
        expected_hash: Option<&str>,
    ) -> Result<BackendOutcome<PatchResult>> {
        let _guard = self.locks.lock(path).await;
        let engine = self.fs.engine();

        self.run(
            "edit_note",
            |api| async move {
                let current = api.read_note(path).await?;
                let plan = engine.plan(path.as_str(), &current, edits, dry_run, expected_hash)?;
                if let PatchPlan::Commit { content, .. } = &plan {
                    api.update_note(path, content).await?;
                }
                Ok(plan.into_result())
            },
            || self.fs.edit_note(path, edits, dry_run, expected_hash),
        )
        .await
    }

    pub async fn search_vault(&self, query: &str) -> Result<BackendOutcome<Vec<SearchHit>>> {
        if query.trim().is_empty() {
            return Err(Error::validation_error("Search query is required"));
        }

        self.run(
            "search_vault",
            |api| async move { api.search(query).await },
            || self.fs.search(query),
        )
        .await
    }

    pub async fn delete_note(&self, path: &NotePath) -> Result<BackendOutcome<()>> {
        let _guard = self.locks.lock(path).await;
        self.run(
            "delete_note",
            |api| async move { api.delete_note(path).await },
            || self.fs.delete_note(path),
        )
        .await
    }

    pub async fn move_note(
        &self,
        source: &NotePath,
        destination: &NotePath,
    ) -> Result<BackendOutcome<()>> {
        let _guards = self.locks.lock_all(&[source, destination]).await;
        self.run(
            "move_note",
            |api| async move { api.move_note(source, destination).await },
            || self.fs.move_note(source, destination),
        )
        .await
    }

    pub async fn create_folder(&self, path: &NotePath) -> Result<BackendOutcome<()>> {
        self.run(
            "create_folder",
            |api| async move { api.create_folder(path).await },
            || self.fs.create_folder(path),
        )
        .await
    }

    /// Rename or move a folder
    pub async fn rename_folder(
        &self,
        source: &NotePath,
        destination: &NotePath,
    ) -> Result<BackendOutcome<()>> {
        let _tree = self.locks.lock_tree().await;
        self.run(
            "rename_folder",
            |api| async move { api.rename_folder(source, destination).await },
            || self.fs.rename_folder(source, destination),
        )
        .await
    }

    pub async fn delete_folder(&self, path: &NotePath) -> Result<BackendOutcome<()>> {
        let _tree = self.locks.lock_tree().await;
        self.run(
            "delete_folder",
            |api| async move { api.delete_folder(path).await },
            || self.fs.delete_folder(path),
        )
        .await
    }

    async fn run<T, R, RF, L, LF>(
        &self,
        operation: &str,
        remote: R,
        local: L,
    ) -> Result<BackendOutcome<T>>
    where
        R: FnOnce(Arc<dyn VaultApi>) -> RF,
        RF: Future<Output = Result<T>>,
        L: FnOnce() -> LF,
        LF: Future<Output = Result<T>>,
    {
        match &self.api {
            Some(api) => {
                let api = Arc::clone(api);
                with_fallback(operation, move || remote(api), local).await
            }
            None => local_only(local).await,
        }
    }
}

fn message(text: String) -> OperationOutput {
    OperationOutput::Message(text)
}

fn in_folder(note: &str, folder: &NotePath) -> bool {
    note.strip_prefix(folder.as_str())
        .is_some_and(|rest| rest.starts_with('/'))
}
