//! # vaultlink
//!
//! Command-line access to a note vault for agents and scripts.
//!
//! Each invocation runs one [`vaultlink_tools::VaultOperation`]: against the
//! note application's REST API when it answers, otherwise directly against
//! the vault directory.
//!
//! ```text
//! vaultlink --vault-path ~/Vault read inbox.md
//! vaultlink edit journal/today.md --old "- [ ] ship" --new "- [x] ship" --dry-run
//! vaultlink exec '{"tool":"move_note","sourcePath":"a.md","destinationPath":"archive/a.md"}'
//! ```

pub mod cli;

pub use cli::{Args, Command, FolderCommand, build_config, execute, log_filter, run};
