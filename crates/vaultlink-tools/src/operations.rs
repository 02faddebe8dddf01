//! Vault operations as data.
//!
//! Every operation a caller can request is one variant of [`VaultOperation`],
//! carrying its typed arguments. Requests arrive as JSON tagged by `tool`:
//!
//! ```json
//! { "tool": "edit_note", "path": "a.md", "edits": [{ "oldText": "x", "newText": "y" }], "dry_run": true }
//! ```

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use vaultlink_core::prelude::*;

/// A single vault operation with its arguments
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "tool", rename_all = "snake_case")]
pub enum VaultOperation {
    /// List notes under a folder (the whole vault when absent or empty)
    ListNotes {
        #[serde(default, deserialize_with = "folder_or_root")]
        folder: Option<NotePath>,
    },

    ReadNote { path: NotePath },

    ReadMultipleNotes { paths: Vec<NotePath> },

    CreateNote { path: NotePath, content: String },

    UpdateNote { path: NotePath, content: String },

    /// Apply an ordered edit batch, or preview it with `dry_run`
    EditNote {
        path: NotePath,
        edits: Vec<EditOperation>,
        #[serde(default, alias = "dryRun")]
        dry_run: bool,
        #[serde(default, alias = "expectedHash", skip_serializing_if = "Option::is_none")]
        expected_hash: Option<String>,
    },

    SearchVault { query: String },

    DeleteNote { path: NotePath },

    MoveNote {
        #[serde(alias = "sourcePath")]
        source: NotePath,
        #[serde(alias = "destinationPath")]
        destination: NotePath,
    },

    CreateFolder { path: NotePath },

    RenameFolder {
        path: NotePath,
        #[serde(alias = "newPath")]
        new_path: NotePath,
    },

    MoveFolder {
        path: NotePath,
        #[serde(alias = "newPath")]
        new_path: NotePath,
    },

    DeleteFolder { path: NotePath },
}

fn folder_or_root<'de, D>(deserializer: D) -> std::result::Result<Option<NotePath>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)? {
        Some(raw) => NotePath::parse_folder(&raw).map_err(D::Error::custom),
        None => Ok(None),
    }
}

impl VaultOperation {
    /// Tool name, as used in the `tool` tag
    pub fn name(&self) -> &'static str {
        match self {
            Self::ListNotes { .. } => "list_notes",
            Self::ReadNote { .. } => "read_note",
            Self::ReadMultipleNotes { .. } => "read_multiple_notes",
            Self::CreateNote { .. } => "create_note",
            Self::UpdateNote { .. } => "update_note",
            Self::EditNote { .. } => "edit_note",
            Self::SearchVault { .. } => "search_vault",
            Self::DeleteNote { .. } => "delete_note",
            Self::MoveNote { .. } => "move_note",
            Self::CreateFolder { .. } => "create_folder",
            Self::RenameFolder { .. } => "rename_folder",
            Self::MoveFolder { .. } => "move_folder",
            Self::DeleteFolder { .. } => "delete_folder",
        }
    }

    /// Whether the operation can change the vault
    pub fn is_mutating(&self) -> bool {
        !matches!(
            self,
            Self::ListNotes { .. }
                | Self::ReadNote { .. }
                | Self::ReadMultipleNotes { .. }
                | Self::SearchVault { .. }
        ) && !matches!(self, Self::EditNote { dry_run: true, .. })
    }

    /// Parse an operation from its JSON form
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| Error::validation_error(format!("Invalid operation: {}", e)))
    }
}

/// What a successful operation returns
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum OperationOutput {
    /// Note paths from a listing
    Notes(Vec<String>),
    /// Content of a single note
    Content(String),
    /// Per-path results of a multi-note read
    Contents(Vec<NoteReadResult>),
    SearchResults(Vec<SearchHit>),
    /// Preview diff or committed hash of an edit batch
    Patch(PatchResult),
    /// Confirmation of a mutation
    Message(String),
}

impl OperationOutput {
    /// Human-readable rendering: raw content, diffs and messages as-is,
    /// structured results as pretty JSON
    pub fn render(&self) -> Result<String> {
        let rendered = match self {
            Self::Content(content) => content.clone(),
            Self::Message(message) => message.clone(),
            Self::Patch(PatchResult::Preview { diff }) => diff.clone(),
            Self::Patch(PatchResult::Committed { hash }) => {
                format!("Edits applied successfully (hash: {})", hash)
            }
            Self::Notes(notes) => to_pretty_json(notes)?,
            Self::Contents(results) => to_pretty_json(results)?,
            Self::SearchResults(hits) => to_pretty_json(hits)?,
        };
        Ok(rendered)
    }
}

fn to_pretty_json<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value)
        .map_err(|e| Error::other(format!("Failed to serialize result: {}", e)))
}

impl fmt::Display for VaultOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ListNotes { folder: Some(folder) } => write!(f, "list_notes {}", folder),
            Self::ListNotes { folder: None } => f.write_str("list_notes"),
            Self::ReadNote { path }
            | Self::CreateNote { path, .. }
            | Self::UpdateNote { path, .. }
            | Self::EditNote { path, .. }
            | Self::DeleteNote { path }
            | Self::CreateFolder { path }
            | Self::DeleteFolder { path } => write!(f, "{} {}", self.name(), path),
            Self::ReadMultipleNotes { paths } => {
                write!(f, "read_multiple_notes ({} paths)", paths.len())
            }
            Self::SearchVault { query } => write!(f, "search_vault {:?}", query),
            Self::MoveNote {
                source,
                destination,
            } => write!(f, "move_note {} -> {}", source, destination),
            Self::RenameFolder { path, new_path } | Self::MoveFolder { path, new_path } => {
                write!(f, "{} {} -> {}", self.name(), path, new_path)
            }
        }
    }
}
