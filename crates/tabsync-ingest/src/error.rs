//! Error types for the ingestion pipeline

use crate::store::UploadError;
use crate::table::SchemaMismatch;

/// Result type for ingestion operations
pub type Result<T> = std::result::Result<T, IngestError>;

/// Error types for ingestion
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error(transparent)]
    Common(#[from] tabsync_common::TabsyncError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Download error: {0}")]
    Download(#[from] reqwest::Error),

    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Directory walk error: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error(transparent)]
    SchemaMismatch(#[from] SchemaMismatch),

    #[error("Upload failed: {0}")]
    Upload(#[from] UploadError),

    #[error("Ledger error at {path}: {source}")]
    Ledger {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Table store unusable after {failures} consecutive upload failures; last error: {last}")]
    StoreUnreachable { failures: u32, last: UploadError },
}

impl From<regex::Error> for IngestError {
    fn from(err: regex::Error) -> Self {
        IngestError::Validation(err.to_string())
    }
}

impl From<url::ParseError> for IngestError {
    fn from(err: url::ParseError) -> Self {
        IngestError::Parse(err.to_string())
    }
}
