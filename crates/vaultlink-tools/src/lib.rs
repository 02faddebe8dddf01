//! # Vault Tools
//!
//! The operations an agent can run against a vault, and the service that
//! routes them to a backend.
//!
//! ## Operations
//!
//! [`operations::VaultOperation`] is a closed set of operations, each with typed
//! arguments:
//! - Notes: list, read, read many, create, update, edit, delete, move
//! - Search: case-insensitive substring search
//! - Folders: create, rename, move, delete
//!
//! ## Backend Selection
//!
//! [`service::VaultService`] runs each operation against the remote API and
//! falls back to the vault directory when the API is unreachable. The result
//! says which backend served it:
//!
//! ```no_run
//! use vaultlink_tools::prelude::*;
//!
//! # async fn example(config: ServerConfig) -> Result<()> {
//! let service = VaultService::new(&config)?;
//! let op = VaultOperation::from_json(r#"{"tool":"read_note","path":"inbox.md"}"#)?;
//!
//! let outcome = service.execute(op).await?;
//! println!("[{}] {}", outcome.backend(), outcome.as_inner().render()?);
//! # Ok(())
//! # }
//! ```

pub mod operations;
pub mod service;

pub use operations::{OperationOutput, VaultOperation};
pub use service::VaultService;

pub mod prelude {
    pub use crate::operations::{OperationOutput, VaultOperation};
    pub use crate::service::VaultService;
    pub use vaultlink_core::prelude::*;
}
