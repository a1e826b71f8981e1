//! Per-run outcome summary

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::store::AppendReceipt;

/// What happened to one discovered file
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FileOutcome {
    /// Rows appended and the file recorded in the ledger
    Uploaded {
        rows: usize,
        skipped: usize,
        receipt: AppendReceipt,
    },
    /// Nothing to upload; recorded in the ledger. `skipped` is non-zero when
    /// every data row was rejected.
    Empty { skipped: usize },
    /// Not recorded; picked up again by the next run
    Failed { reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileReport {
    pub file_id: String,
    pub table_name: String,
    #[serde(flatten)]
    pub outcome: FileOutcome,
}

/// Outcome of one ingestion run
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub files: Vec<FileReport>,
    /// Skipped-row alerts the sink did not deliver
    pub alerts_failed: usize,
}

impl RunReport {
    pub fn new(run_id: Uuid) -> Self {
        Self {
            run_id,
            started_at: Utc::now(),
            finished_at: None,
            files: Vec::new(),
            alerts_failed: 0,
        }
    }

    pub fn push(&mut self, file_id: &str, table_name: &str, outcome: FileOutcome) {
        self.files.push(FileReport {
            file_id: file_id.to_string(),
            table_name: table_name.to_string(),
            outcome,
        });
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    pub fn uploaded(&self) -> usize {
        self.count(|o| matches!(o, FileOutcome::Uploaded { .. }))
    }

    pub fn empty(&self) -> usize {
        self.count(|o| matches!(o, FileOutcome::Empty { .. }))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, FileOutcome::Failed { .. }))
    }

    /// Data rows appended across all tables
    pub fn rows_uploaded(&self) -> usize {
        self.files
            .iter()
            .map(|f| match f.outcome {
                FileOutcome::Uploaded { rows, .. } => rows,
                _ => 0,
            })
            .sum()
    }

    pub fn is_success(&self) -> bool {
        self.failed() == 0
    }

    fn count(&self, pred: impl Fn(&FileOutcome) -> bool) -> usize {
        self.files.iter().filter(|f| pred(&f.outcome)).count()
    }
}
