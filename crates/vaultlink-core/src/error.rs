//! Error types for vault operations.
//!
//! All errors in the system are represented by the [`Error`] enum.
//! Remote failures are collapsed into [`Error::BackendUnavailable`], which is
//! the only variant the backend selector treats as recoverable.

use std::io;
use std::path::PathBuf;
use thiserror::Error as ThisError;

/// Maximum number of characters of an unmatched edit shown in errors
pub const SNIPPET_LIMIT: usize = 100;

/// The core error type for all vault operations.
#[derive(ThisError, Debug)]
pub enum Error {
    /// File system error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Remote vault API unreachable or returned an error status
    #[error("Remote API unavailable during {operation}: {reason}")]
    BackendUnavailable { operation: String, reason: String },

    /// Note or folder absent where it must exist
    #[error("Not found: {path}")]
    NotFound { path: String },

    /// Destination of a move or rename is occupied
    #[error("Destination already exists: {path}")]
    AlreadyExists { path: String },

    /// An edit's old text could not be located, exactly or fuzzily
    #[error("Edit {index} failed: could not find text to replace: {snippet:?}")]
    EditNotFound { index: usize, snippet: String },

    /// Atomic commit failed
    #[error("Failed to write {}: {source}", path.display())]
    WriteError {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Path resolves outside the vault root
    #[error("Path traversal detected: {path}")]
    PathTraversal { path: String },

    /// Malformed note path
    #[error("Invalid path: {reason}")]
    InvalidPath { reason: String },

    /// Note changed since the caller last read it
    #[error("Note modified since read. Expected hash: {expected}, actual: {actual}")]
    Conflict { expected: String, actual: String },

    /// Invalid configuration
    #[error("Configuration error: {reason}")]
    ConfigError { reason: String },

    /// Invalid operation arguments
    #[error("Validation error: {reason}")]
    ValidationError { reason: String },

    /// Generic unclassified error
    #[error("Error: {0}")]
    Other(String),
}

/// Convenient Result type alias
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create an IO error
    pub fn io(err: io::Error) -> Self {
        Error::Io(err)
    }

    /// Create a remote-unavailable error
    pub fn backend_unavailable(operation: impl Into<String>, reason: impl ToString) -> Self {
        Error::BackendUnavailable {
            operation: operation.into(),
            reason: reason.to_string(),
        }
    }

    /// Create a not found error
    pub fn not_found(path: impl Into<String>) -> Self {
        Error::NotFound { path: path.into() }
    }

    /// Create an already-exists error
    pub fn already_exists(path: impl Into<String>) -> Self {
        Error::AlreadyExists { path: path.into() }
    }

    /// Create an edit-not-found error, truncating the unmatched text
    pub fn edit_not_found(index: usize, old_text: &str) -> Self {
        Error::EditNotFound {
            index,
            snippet: truncate_snippet(old_text),
        }
    }

    /// Create a write error for `path`
    pub fn write_error(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Error::WriteError {
            path: path.into(),
            source,
        }
    }

    /// Create a path traversal error
    pub fn path_traversal(path: impl Into<String>) -> Self {
        Error::PathTraversal { path: path.into() }
    }

    /// Create an invalid path error
    pub fn invalid_path(reason: impl Into<String>) -> Self {
        Error::InvalidPath {
            reason: reason.into(),
        }
    }

    /// Create a hash conflict error
    pub fn conflict(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Error::Conflict {
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Create a configuration error
    pub fn config_error(reason: impl Into<String>) -> Self {
        Error::ConfigError {
            reason: reason.into(),
        }
    }

    /// Create a validation error
    pub fn validation_error(reason: impl Into<String>) -> Self {
        Error::ValidationError {
            reason: reason.into(),
        }
    }

    /// Create a generic error
    pub fn other(msg: impl Into<String>) -> Self {
        Error::Other(msg.into())
    }

    /// Whether the filesystem fallback should be attempted for this error
    pub fn is_backend_unavailable(&self) -> bool {
        matches!(self, Error::BackendUnavailable { .. })
    }

    /// Map an I/O error on `path`, turning `NotFound` into [`Error::NotFound`]
    pub fn from_io_at(err: io::Error, path: impl Into<String>) -> Self {
        if err.kind() == io::ErrorKind::NotFound {
            Error::not_found(path)
        } else {
            Error::Io(err)
        }
    }
}

fn truncate_snippet(text: &str) -> String {
    match text.char_indices().nth(SNIPPET_LIMIT) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}
