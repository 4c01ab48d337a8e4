//! Snapshot error types.

use thiserror::Error;

/// Result type alias for snapshot operations.
pub type SnapshotResult<T> = Result<T, SnapshotError>;

/// Errors that can occur during snapshot operations.
///
/// `NotFound` and `Duplicate` are recoverable; the simulator routinely
/// probes for both. `InvalidOperation` signals structural misuse of the
/// fork lifecycle and callers are expected to treat it as fatal.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SnapshotError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("already exists: {0}")]
    Duplicate(String),

    #[error("invalid operation: {0}")]
    InvalidOperation(&'static str),
}

impl SnapshotError {
    pub(crate) fn node_not_found(name: &str) -> Self {
        Self::NotFound(format!("node {name}"))
    }

    pub(crate) fn workload_not_found(id: &str) -> Self {
        Self::NotFound(format!("workload {id}"))
    }

    pub(crate) fn duplicate_node(name: &str) -> Self {
        Self::Duplicate(format!("node {name}"))
    }

    pub(crate) fn duplicate_workload(id: &str) -> Self {
        Self::Duplicate(format!("workload {id}"))
    }

    /// Whether this is the recoverable `NotFound` kind.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Whether this is the recoverable `Duplicate` kind.
    pub fn is_duplicate(&self) -> bool {
        matches!(self, Self::Duplicate(_))
    }
}
