//! Table store seam
//!
//! The orchestrator only talks to [`RemoteTableStore`]. A store must report
//! success only once the rows are durably appended; anything it cannot
//! confirm is an error, and an append whose transfer state is unknown is
//! [`UploadError::Ambiguous`]. Re-appending the same rows after such a
//! failure has to be acceptable to the store.

pub mod fs;

use async_trait::async_trait;
use serde::Serialize;

use crate::table::TableArtifact;

pub use fs::FsTableStore;

/// Reasons an append did not complete
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UploadError {
    /// The store could not be reached; nothing was transferred
    #[error("table store unreachable: {0}")]
    Unreachable(String),

    /// The store refused the rows; nothing was appended
    #[error("append rejected: {0}")]
    Rejected(String),

    /// The transfer failed part-way; some rows may have been appended
    #[error("append outcome unknown: {0}")]
    Ambiguous(String),

    #[error("not authorized: {0}")]
    Unauthorized(String),

    #[error("store misconfigured: {0}")]
    Misconfigured(String),
}

impl UploadError {
    /// Errors that retrying on the next run cannot fix
    pub fn is_fatal(&self) -> bool {
        matches!(self, UploadError::Unauthorized(_) | UploadError::Misconfigured(_))
    }
}

/// Reference to a table that exists in the store
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableHandle {
    pub name: String,
}

/// Confirmation of a completed append
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AppendReceipt {
    pub row_count_before: u64,
    pub row_count_after: u64,
    pub column_count: usize,
}

impl AppendReceipt {
    pub fn rows_added(&self) -> u64 {
        self.row_count_after.saturating_sub(self.row_count_before)
    }
}

/// Append-only tabular storage
#[async_trait]
pub trait RemoteTableStore: Send + Sync {
    /// Create the table if it is missing; calling it again is harmless
    async fn ensure_table(&self, name: &str) -> Result<TableHandle, UploadError>;

    /// Append every row of `artifact` and return once the store confirms it
    async fn append(
        &self,
        table: &TableHandle,
        artifact: TableArtifact,
    ) -> Result<AppendReceipt, UploadError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_classification() {
        assert!(UploadError::Unauthorized("token expired".into()).is_fatal());
        assert!(UploadError::Misconfigured("no such dataset".into()).is_fatal());
        assert!(!UploadError::Unreachable("timeout".into()).is_fatal());
        assert!(!UploadError::Ambiguous("connection reset".into()).is_fatal());
        assert!(!UploadError::Rejected("bad header".into()).is_fatal());
    }

    #[test]
    fn test_rows_added() {
        let receipt = AppendReceipt {
            row_count_before: 10,
            row_count_after: 14,
            column_count: 3,
        };
        assert_eq!(receipt.rows_added(), 4);
    }
}
