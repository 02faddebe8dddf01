//! # vaultlink core
//!
//! Core data models, error types and configuration shared by every vaultlink
//! crate.
//!
//! ## Core Modules
//!
//! - [`models`] - Note paths, edit operations, patch and search results
//! - [`error`] - Error taxonomy and Result alias
//! - [`config`] - Vault and remote API configuration
//! - [`profiles`] - Configuration presets
//! - [`resilience`] - Remote-first execution with filesystem fallback
//! - [`utils`] - Path resolution against the vault root
//!
//! ## Error Handling
//!
//! ```
//! use vaultlink_core::prelude::*;
//!
//! fn check(path: &str) -> Result<NotePath> {
//!     NotePath::parse(path)
//! }
//!
//! assert!(check("notes/today.md").is_ok());
//! assert!(check("../outside.md").is_err());
//! ```

pub mod config;
pub mod error;
pub mod models;
pub mod profiles;
pub mod resilience;
pub mod utils;

pub use config::*;
pub use error::{Error, Result};
pub use models::*;
pub use profiles::ConfigProfile;
pub use resilience::{Backend, BackendOutcome, local_only, with_fallback};
pub use utils::PathResolver;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::{ApiConfig, ServerConfig, VaultConfig};
    pub use crate::error::{Error, Result};
    pub use crate::models::{
        EditOperation, NotePath, NoteReadResult, PatchResult, SearchHit, SearchMatch,
    };
    pub use crate::profiles::ConfigProfile;
    pub use crate::resilience::{Backend, BackendOutcome};
    pub use crate::utils::PathResolver;
}
