//! Ingestion orchestrator
//!
//! Finds release files missing from the ledger, normalizes each one, appends
//! its rows to the table store and records it once the store confirms.
//! Files are processed strictly one after another.

use std::sync::Arc;

use tabsync_common::SourceFile;
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::alert::{skipped_rows_message, AlertSink};
use crate::config::IngestOptions;
use crate::discovery::{discover_pending, FileFilter, TableGroup};
use crate::error::{IngestError, Result};
use crate::ledger::Ledger;
use crate::normalize::{NormalizedFile, RowNormalizer, SkipReport};
use crate::report::{FileOutcome, RunReport};
use crate::store::RemoteTableStore;
use crate::table::TableBuilder;

/// Drives one ingestion run over the extraction tree.
pub struct IngestionOrchestrator {
    options: IngestOptions,
    store: Arc<dyn RemoteTableStore>,
    alerts: Arc<dyn AlertSink>,
    ledger: Ledger,
}

impl IngestionOrchestrator {
    pub fn new(
        options: IngestOptions,
        store: Arc<dyn RemoteTableStore>,
        alerts: Arc<dyn AlertSink>,
        ledger: Ledger,
    ) -> Self {
        Self {
            options,
            store,
            alerts,
            ledger,
        }
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// Pending files grouped by table, in processing order
    pub fn pending(&self) -> Result<Vec<TableGroup>> {
        let filter = FileFilter::new(&self.options.file_extension, &self.options.exclude_patterns)?;
        discover_pending(
            &self.options.extract_path,
            &filter,
            &self.options.table_name_prefix,
            &self.ledger,
        )
    }

    /// Ingest every pending file.
    ///
    /// Per-file failures are reported in the returned [`RunReport`]. The run
    /// itself fails only when continuing is pointless: the store rejected our
    /// credentials or configuration, too many uploads failed in a row, or the
    /// ledger could not be written.
    pub async fn run(&mut self) -> Result<RunReport> {
        let run_id = Uuid::new_v4();
        let span = info_span!("ingest_run", %run_id);
        self.run_inner(run_id).instrument(span).await
    }

    async fn run_inner(&mut self, run_id: Uuid) -> Result<RunReport> {
        let mut report = RunReport::new(run_id);
        info!(root = %self.options.extract_path.display(), "Starting ingestion run");

        let groups = self.pending()?;
        if groups.is_empty() {
            info!("No pending files to ingest");
            report.finish();
            return Ok(report);
        }

        let max_failures = self.options.max_consecutive_upload_failures;
        let mut consecutive_failures = 0u32;

        for group in groups {
            info!(table = %group.table_name, files = group.files.len(), "Processing table");

            for file in &group.files {
                let span = info_span!("file", path = %file.id(), table = %file.table_name());
                let result = self.process_file(file, &mut report).instrument(span).await;

                match result {
                    Ok(outcome) => {
                        if matches!(outcome, FileOutcome::Uploaded { .. }) {
                            consecutive_failures = 0;
                        }
                        report.push(file.id(), file.table_name(), outcome);
                    },
                    Err(IngestError::Upload(e)) => {
                        error!(path = %file.id(), error = %e, "Upload failed, file will be retried next run");
                        report.push(
                            file.id(),
                            file.table_name(),
                            FileOutcome::Failed {
                                reason: e.to_string(),
                            },
                        );

                        if e.is_fatal() {
                            error!(error = %e, "Table store error is not recoverable, aborting run");
                            return Err(IngestError::Upload(e));
                        }

                        consecutive_failures += 1;
                        if consecutive_failures >= max_failures {
                            error!(
                                failures = consecutive_failures,
                                "Too many consecutive upload failures, aborting run"
                            );
                            return Err(IngestError::StoreUnreachable {
                                failures: consecutive_failures,
                                last: e,
                            });
                        }
                    },
                    Err(e @ IngestError::Ledger { .. }) => {
                        error!(error = %e, "Ledger write failed, aborting run");
                        return Err(e);
                    },
                    Err(e) => {
                        error!(path = %file.id(), error = %e, "File ingestion failed");
                        report.push(
                            file.id(),
                            file.table_name(),
                            FileOutcome::Failed {
                                reason: e.to_string(),
                            },
                        );
                    },
                }
            }
        }

        report.finish();
        info!(
            uploaded = report.uploaded(),
            empty = report.empty(),
            failed = report.failed(),
            rows = report.rows_uploaded(),
            alerts_failed = report.alerts_failed,
            "Ingestion run completed"
        );

        Ok(report)
    }

    async fn process_file(&mut self, file: &SourceFile, report: &mut RunReport) -> Result<FileOutcome> {
        let normalized = RowNormalizer::normalize_file(file.path())?;
        log_normalization(file, &normalized);

        if normalized.is_empty() {
            info!(path = %file.id(), "File has no data rows, recording without upload");
            self.ledger.append(file.id())?;
            return Ok(FileOutcome::Empty { skipped: 0 });
        }

        let skipped_count = normalized.skipped_count();
        let (header, rows, skipped) = normalized.into_parts();

        if rows.is_empty() {
            warn!(path = %file.id(), skipped = skipped_count, "Every data row was skipped, recording without upload");
            self.ledger.append(file.id())?;
            self.alert_skipped(file, &skipped, report).await;
            return Ok(FileOutcome::Empty {
                skipped: skipped_count,
            });
        }

        let artifact = TableBuilder::build(header, rows).map_err(|e| {
            error!(path = %file.id(), error = %e, "Normalized rows do not fit the header");
            IngestError::SchemaMismatch(e)
        })?;

        std::fs::create_dir_all(&self.options.work_path)?;
        let staged = self
            .options
            .work_path
            .join(format!("{}.csv", file.table_name()));
        artifact.write_csv(&staged)?;
        debug!(staged = %staged.display(), "Staged table");

        let row_count = artifact.row_count();
        let handle = self
            .store
            .ensure_table(file.table_name())
            .await
            .map_err(IngestError::Upload)?;
        let receipt = self
            .store
            .append(&handle, artifact)
            .await
            .map_err(IngestError::Upload)?;

        if receipt.rows_added() != row_count as u64 {
            warn!(
                expected = row_count,
                added = receipt.rows_added(),
                "Store row count changed by an unexpected amount"
            );
        }

        self.ledger.append(file.id())?;
        info!(
            table = %handle.name,
            rows = row_count,
            rows_before = receipt.row_count_before,
            rows_after = receipt.row_count_after,
            columns = receipt.column_count,
            "Uploaded file"
        );

        if !skipped.is_empty() {
            self.alert_skipped(file, &skipped, report).await;
        }

        Ok(FileOutcome::Uploaded {
            rows: row_count,
            skipped: skipped_count,
            receipt,
        })
    }

    async fn alert_skipped(
        &self,
        file: &SourceFile,
        skipped: &SkipReport,
        report: &mut RunReport,
    ) {
        let message = skipped_rows_message(file.id(), skipped, self.options.log_dir.as_deref());
        if !self.alerts.notify(&message).await {
            error!(path = %file.id(), "Skipped-row alert was not delivered");
            report.alerts_failed += 1;
        }
    }
}

fn log_normalization(file: &SourceFile, normalized: &NormalizedFile) {
    for entry in normalized.skipped().entries() {
        info!(path = %file.id(), index = entry.index, fields = ?entry.fields, "Skipped row");
    }
    info!(
        path = %file.id(),
        total = normalized.total_rows(),
        skipped = normalized.skipped_count(),
        skipped_pct = normalized.skipped_percentage(),
        "Normalized file"
    );
}
