//! Graceful degradation: remote-first execution with a local fallback.
//!
//! Every logical vault operation has a remote implementation and a local one.
//! [`with_fallback`] runs the remote attempt and, only when it fails with
//! [`crate::Error::BackendUnavailable`], runs the local attempt once. There are no
//! retries and no backoff. Any other error from the remote attempt (a missing
//! edit target, a hash conflict) is a genuine failure and is returned as is.

use crate::error::Result;
use serde::Serialize;
use std::fmt;
use std::future::Future;

/// Which backend produced a result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Backend {
    /// Remote vault API
    Api,
    /// Direct filesystem access
    Filesystem,
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Api => f.write_str("api"),
            Self::Filesystem => f.write_str("filesystem"),
        }
    }
}

/// Successful result tagged with the backend that produced it
#[derive(Debug, Clone, PartialEq)]
pub enum BackendOutcome<T> {
    /// The remote API handled the operation
    Api(T),
    /// The remote API failed (or is disabled) and the filesystem handled it
    Filesystem(T),
}

impl<T> BackendOutcome<T> {
    pub fn backend(&self) -> Backend {
        match self {
            Self::Api(_) => Backend::Api,
            Self::Filesystem(_) => Backend::Filesystem,
        }
    }

    pub fn into_inner(self) -> T {
        match self {
            Self::Api(value) | Self::Filesystem(value) => value,
        }
    }

    pub fn as_inner(&self) -> &T {
        match self {
            Self::Api(value) | Self::Filesystem(value) => value,
        }
    }

    /// Transform the value, keeping the backend tag
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> BackendOutcome<U> {
        match self {
            Self::Api(value) => BackendOutcome::Api(f(value)),
            Self::Filesystem(value) => BackendOutcome::Filesystem(f(value)),
        }
    }
}

/// Run `remote`, falling back to `local` when the remote backend is unavailable.
///
/// A warning is logged on every remote failure, including when the fallback
/// then succeeds. When both fail, the local error is returned and the remote
/// error only appears in the log.
pub async fn with_fallback<T, R, RF, L, LF>(
    operation: &str,
    remote: R,
    local: L,
) -> Result<BackendOutcome<T>>
where
    R: FnOnce() -> RF,
    RF: Future<Output = Result<T>>,
    L: FnOnce() -> LF,
    LF: Future<Output = Result<T>>,
{
    match remote().await {
        Ok(value) => Ok(BackendOutcome::Api(value)),
        Err(err) if err.is_backend_unavailable() => {
            log::warn!(
                "{}: API request failed, falling back to file system: {}",
                operation,
                err
            );
            local().await.map(BackendOutcome::Filesystem)
        }
        Err(err) => Err(err),
    }
}

/// Run only the local implementation, for when the remote API is disabled
pub async fn local_only<T, L, LF>(local: L) -> Result<BackendOutcome<T>>
where
    L: FnOnce() -> LF,
    LF: Future<Output = Result<T>>,
{
    local().await.map(BackendOutcome::Filesystem)
}
