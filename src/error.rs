//! Error types for the indexing pipeline.
//!
//! [`IndexError`] is the run-level failure type that aborts a command;
//! per-document failures never surface here, they become `failed` entries
//! in the run report. [`StoreError`] carries the transient/permanent split
//! the executor's retry loop keys on.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum IndexError {
    /// Invalid or contradictory configuration, including overlapping
    /// collection routes.
    #[error("configuration error: {0}")]
    Config(String),

    /// A caller-supplied path or directory argument that cannot be used.
    #[error("invalid path: {0}")]
    InvalidPath(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Fingerprint database failure. Always fatal for the run; the
    /// fingerprint store is local state we cannot proceed without.
    #[error("fingerprint store error: {0}")]
    Fingerprint(#[from] sqlx::Error),

    /// An executor worker task panicked or was cancelled.
    #[error("worker task failed: {0}")]
    Task(String),
}

pub type Result<T> = std::result::Result<T, IndexError>;

/// A path that matches no collection route.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("no collection route matches '{path}'")]
pub struct ResolutionError {
    pub path: String,
}

/// Vector-store failure, classified for the retry loop.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// Worth retrying: lock contention, pool exhaustion, timeouts.
    #[error("transient store error: {0}")]
    Transient(String),

    /// Not worth retrying; reported as a per-document failure.
    #[error("store error: {0}")]
    Permanent(String),
}
