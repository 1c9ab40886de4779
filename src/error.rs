//! Errors common to the sync engine.
//!
//! Mirrors `kitchen-fridge::error::KFError`: a `thiserror`-derived enum with
//! named, structured variants, no `anyhow`/`Box<dyn Error>` at the boundary.

use crate::ids::ProviderId;

/// Error surfaced by a remote adapter call.
#[derive(thiserror::Error, Debug, Clone)]
#[error("{0}")]
pub struct RemoteError(pub String);

impl RemoteError {
    pub fn new(detail: impl Into<String>) -> Self {
        Self(detail.into())
    }
}

/// Error surfaced by a local store, tag store or mapping store call.
#[derive(thiserror::Error, Debug, Clone)]
pub enum StoreError {
    /// A `(providerId, remoteId)` or `(providerId, localTaskId)` uniqueness
    /// invariant on the mapping store was violated. Distinguished from
    /// `Other` so phase 4 can match on it specifically and defer rather than
    /// treat it as an opaque failure (see DESIGN.md).
    #[error("unique constraint violated: {0}")]
    UniqueViolation(String),

    #[error("{0}")]
    Other(String),
}

impl StoreError {
    pub fn other(detail: impl Into<String>) -> Self {
        Self::Other(detail.into())
    }
}

/// Top-level error type for a sync run.
#[derive(thiserror::Error, Debug, Clone)]
pub enum SyncError {
    /// The adapter reports the provider is not logged in, or its token has
    /// expired. Only ever raised by the initial remote fetch; aborts the run
    /// before phase 1.
    #[error("not logged in to provider {provider}: {detail}")]
    Auth { provider: ProviderId, detail: String },

    #[error("remote error: {0}")]
    Remote(#[from] RemoteError),

    #[error("local store error: {0}")]
    Store(#[from] StoreError),

    /// A second `run()` was requested for a provider that already has one in
    /// flight.
    #[error("a sync for provider {0} is already running")]
    AlreadyRunning(ProviderId),
}

pub type SyncResult<T> = Result<T, SyncError>;
