//! # Vault
//!
//! Local mutation machinery for a markdown vault.
//!
//! This crate provides:
//! - [`edit::EditEngine`]: ordered text patches with exact, then
//!   indentation-preserving line matching
//! - [`diff::render_diff`]: unified diffs for dry-run previews
//! - [`atomic::DurableWriter`]: write-to-temp then rename commits
//! - [`prune::DirectoryPruner`]: removal of folders emptied by deletes and moves
//! - [`locks::NoteLocks`]: per-note serialization of in-process writers
//! - [`manager::FilesystemVault`]: every vault operation against the local directory
//!
//! ## Quick Start
//!
//! ```no_run
//! use vaultlink_vault::prelude::*;
//!
//! # async fn example() -> Result<()> {
//! let vault = VaultConfig::builder("~/Documents/Vault").build()?;
//! let fs_vault = FilesystemVault::new(&ServerConfig::new(vault));
//!
//! let note = NotePath::parse("journal/today.md")?;
//! let preview = fs_vault
//!     .edit_note(&note, &[EditOperation::new("TODO", "DONE")], true, None)
//!     .await?;
//! if let PatchResult::Preview { diff } = preview {
//!     println!("{}", diff);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Edit Engine
//!
//! Pure and synchronous:
//! ```
//! use vaultlink_vault::prelude::*;
//!
//! let engine = EditEngine::new();
//! let patched = engine
//!     .apply_edits("  foo\n  bar\n", &[EditOperation::new("foo\nbar", "baz\nqux")])
//!     .unwrap();
//! assert_eq!(patched, "  baz\n  qux\n");
//! ```

pub mod atomic;
pub mod diff;
pub mod edit;
pub mod locks;
pub mod manager;
pub mod prune;

pub use atomic::DurableWriter;
pub use diff::render_diff;
pub use edit::{EditEngine, PatchPlan, compute_hash, normalize_line_endings};
pub use locks::{NoteGuard, NoteLocks, TreeGuard};
pub use manager::FilesystemVault;
pub use prune::DirectoryPruner;
pub use vaultlink_core::prelude::*;

pub mod prelude {
    pub use crate::atomic::DurableWriter;
    pub use crate::diff::render_diff;
    pub use crate::edit::{EditEngine, PatchPlan, compute_hash};
    pub use crate::locks::NoteLocks;
    pub use crate::manager::FilesystemVault;
    pub use crate::prune::DirectoryPruner;
    pub use vaultlink_core::prelude::*;
}
