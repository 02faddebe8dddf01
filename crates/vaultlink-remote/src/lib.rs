//! # Remote vault API
//!
//! Client for the REST API exposed by the note application's local plugin.
//!
//! Every failure (connection refused, timeout, non-success status, malformed
//! body) surfaces as [`vaultlink_core::Error::BackendUnavailable`], which is
//! the signal the backend selector uses to fall back to the filesystem.
//!
//! ```no_run
//! use vaultlink_core::ApiConfig;
//! use vaultlink_remote::{HttpVaultApi, VaultApi};
//!
//! # async fn example() -> vaultlink_core::Result<()> {
//! let api = HttpVaultApi::new(&ApiConfig::default())?;
//! for note in api.list_notes().await? {
//!     println!("{}", note);
//! }
//! # Ok(())
//! # }
//! ```

pub mod client;

pub use client::{HttpVaultApi, VaultApi, folder_url, note_url};
