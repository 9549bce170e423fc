//! Snapshot error types

use thiserror::Error;

/// Result type for snapshot operations
pub type SnapshotResult<T> = Result<T, SnapshotError>;

/// Snapshot codec errors
#[derive(Debug, Clone, Error)]
pub enum SnapshotError {
    /// The file cannot be decoded as a consistent quadruple
    #[error("snapshot corrupt: {0}")]
    Corrupt(String),

    /// Read or write failure
    #[error("i/o error: {0}")]
    Io(String),
}

impl SnapshotError {
    /// Io with path context
    pub(crate) fn io_at(path: &std::path::Path, err: std::io::Error) -> Self {
        SnapshotError::Io(format!("{}: {}", path.display(), err))
    }
}
