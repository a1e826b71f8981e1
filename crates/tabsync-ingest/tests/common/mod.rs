//! Shared fakes and fixtures for tabsync integration tests
//!
//! - [`FakeStore`]: in-memory [`RemoteTableStore`] with scripted failures
//! - [`RecordingSink`]: [`AlertSink`] that keeps every message
//! - [`Workspace`]: temp directory laid out like a real run

#![allow(dead_code, clippy::unwrap_used, clippy::expect_used)]

use std::collections::{BTreeMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tabsync_ingest::alert::AlertSink;
use tabsync_ingest::config::IngestOptions;
use tabsync_ingest::ledger::Ledger;
use tabsync_ingest::store::{AppendReceipt, RemoteTableStore, TableHandle, UploadError};
use tabsync_ingest::table::TableArtifact;
use tabsync_ingest::IngestionOrchestrator;
use tempfile::TempDir;

/// Initialize tracing for tests
pub fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let _ = fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,tabsync_ingest=debug")),
        )
        .with_test_writer()
        .try_init();
}

#[derive(Default)]
pub struct FakeStore {
    tables: Mutex<BTreeMap<String, Vec<Vec<String>>>>,
    /// Table name and row count of every attempted append, in call order
    attempts: Mutex<Vec<(String, usize)>>,
    /// Outcome of upcoming appends; `None` succeeds. Empty means succeed.
    script: Mutex<VecDeque<Option<UploadError>>>,
}

impl FakeStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn scripted(script: Vec<Option<UploadError>>) -> Arc<Self> {
        let store = Self::default();
        *store.script.lock().unwrap() = script.into();
        Arc::new(store)
    }

    pub fn attempts(&self) -> Vec<(String, usize)> {
        self.attempts.lock().unwrap().clone()
    }

    pub fn rows(&self, table: &str) -> Vec<Vec<String>> {
        self.tables
            .lock()
            .unwrap()
            .get(table)
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl RemoteTableStore for FakeStore {
    async fn ensure_table(&self, name: &str) -> Result<TableHandle, UploadError> {
        self.tables
            .lock()
            .unwrap()
            .entry(name.to_string())
            .or_default();
        Ok(TableHandle {
            name: name.to_string(),
        })
    }

    async fn append(
        &self,
        table: &TableHandle,
        artifact: TableArtifact,
    ) -> Result<AppendReceipt, UploadError> {
        self.attempts
            .lock()
            .unwrap()
            .push((table.name.clone(), artifact.row_count()));

        if let Some(Some(err)) = self.script.lock().unwrap().pop_front() {
            return Err(err);
        }

        let mut tables = self.tables.lock().unwrap();
        let rows = tables.entry(table.name.clone()).or_default();
        let before = rows.len() as u64;
        rows.extend(artifact.rows().iter().cloned());

        Ok(AppendReceipt {
            row_count_before: before,
            row_count_after: rows.len() as u64,
            column_count: artifact.column_count(),
        })
    }
}

pub struct RecordingSink {
    deliver: bool,
    messages: Mutex<Vec<String>>,
}

impl RecordingSink {
    pub fn delivering() -> Arc<Self> {
        Arc::new(Self {
            deliver: true,
            messages: Mutex::new(Vec::new()),
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            deliver: false,
            messages: Mutex::new(Vec::new()),
        })
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }
}

#[async_trait]
impl AlertSink for RecordingSink {
    async fn notify(&self, message: &str) -> bool {
        self.messages.lock().unwrap().push(message.to_string());
        self.deliver
    }
}

/// Temp directory with an extraction tree, a ledger and a work directory
pub struct Workspace {
    pub dir: TempDir,
}

impl Workspace {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
        }
    }

    pub fn extract_root(&self) -> PathBuf {
        self.dir.path().join("unzip_files")
    }

    pub fn ledger_path(&self) -> PathBuf {
        self.dir.path().join("uploaded_file_list.txt")
    }

    /// Write `content` to `rel` under the extraction tree; returns its identifier
    pub fn write(&self, rel: &str, content: &str) -> String {
        let path = self.extract_root().join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, content).unwrap();
        path.to_string_lossy().into_owned()
    }

    pub fn options(&self) -> IngestOptions {
        IngestOptions::new()
            .with_extract_path(self.extract_root())
            .with_work_path(self.dir.path().join("datasets"))
            .with_ledger_path(self.ledger_path())
            .with_store_path(self.dir.path().join("table_store"))
            .with_table_name_prefix("sec_")
    }

    pub fn ledger(&self) -> Ledger {
        Ledger::open(self.ledger_path()).unwrap()
    }

    pub fn orchestrator(
        &self,
        options: IngestOptions,
        store: Arc<dyn RemoteTableStore>,
        alerts: Arc<dyn AlertSink>,
    ) -> IngestionOrchestrator {
        IngestionOrchestrator::new(options, store, alerts, self.ledger())
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }
}
