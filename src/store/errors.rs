//! Store error taxonomy
//!
//! Every operation surfaces its failures synchronously through this enum;
//! nothing is retried internally. Batch delete validates before mutating,
//! so a failed batch leaves the store unchanged.

use std::path::PathBuf;

use thiserror::Error;

use super::record::RecordId;
use crate::snapshot::SnapshotError;

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Store errors
#[derive(Debug, Error)]
pub enum StoreError {
    /// `create` collided with existing storage and no override/open mode was given
    #[error("store already exists: {}", .0.display())]
    AlreadyExists(PathBuf),

    /// Open on missing storage, or get/delete on a missing identifier
    #[error("not found: {0}")]
    NotFound(String),

    /// Snapshot cannot be decoded as a consistent quadruple
    #[error("snapshot corrupt: {0}")]
    Corrupt(String),

    /// Reference to an undeclared field
    #[error("unknown field: {0}")]
    UnknownField(String),

    /// Schema mutation collides with an existing field
    #[error("field already defined: {0}")]
    AlreadyDefined(String),

    /// Schema mutation names a reserved field
    #[error("reserved field: {0}")]
    ReservedField(String),

    /// Delete batch contains the same identifier twice
    #[error("duplicate id in batch: {0}")]
    DuplicateId(RecordId),

    /// Index deletion names a field that is not indexed
    #[error("no index on field: {0}")]
    NoIndex(String),

    /// An indexed field holds a value that cannot be a bucket key
    #[error("value for field {0} is not indexable (arrays and objects cannot be bucket keys)")]
    UnindexableValue(String),

    /// Snapshot write/read failure
    #[error("i/o error: {0}")]
    Io(String),
}

impl StoreError {
    /// NotFound for a single missing record id
    pub(crate) fn record_not_found(id: RecordId) -> Self {
        StoreError::NotFound(format!("record {}", id))
    }

    /// NotFound listing every missing id of a batch
    pub(crate) fn records_not_found(ids: &[RecordId]) -> Self {
        StoreError::NotFound(format!("records {:?}", ids))
    }
}

impl From<SnapshotError> for StoreError {
    fn from(err: SnapshotError) -> Self {
        match err {
            SnapshotError::Corrupt(msg) => StoreError::Corrupt(msg),
            SnapshotError::Io(msg) => StoreError::Io(msg),
        }
    }
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        StoreError::Io(err.to_string())
    }
}
