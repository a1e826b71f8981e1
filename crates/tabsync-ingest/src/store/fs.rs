//! Filesystem-backed table store
//!
//! Each table is one CSV file under the store root. Appends never rewrite
//! existing rows; the first append writes the header.

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, info, instrument};

use super::{AppendReceipt, RemoteTableStore, TableHandle, UploadError};
use crate::table::TableArtifact;

#[derive(Debug, Clone)]
pub struct FsTableStore {
    root: PathBuf,
}

impl FsTableStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn table_path(&self, name: &str) -> PathBuf {
        self.root.join(format!("{}.csv", name))
    }

    fn validate_name(name: &str) -> Result<(), UploadError> {
        let valid = !name.is_empty()
            && name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if valid {
            Ok(())
        } else {
            Err(UploadError::Rejected(format!("invalid table name '{}'", name)))
        }
    }
}

/// Header (if any) and data row count of a table file
fn read_table(path: &Path) -> Result<(Option<Vec<String>>, u64), csv::Error> {
    if std::fs::metadata(path)?.len() == 0 {
        return Ok((None, 0));
    }

    let mut reader = csv::ReaderBuilder::new().has_headers(true).from_path(path)?;
    let header = reader.headers()?.iter().map(str::to_string).collect();
    let mut rows = 0u64;
    for record in reader.records() {
        record?;
        rows += 1;
    }
    Ok((Some(header), rows))
}

#[async_trait]
impl RemoteTableStore for FsTableStore {
    #[instrument(skip(self))]
    async fn ensure_table(&self, name: &str) -> Result<TableHandle, UploadError> {
        Self::validate_name(name)?;

        std::fs::create_dir_all(&self.root).map_err(|e| {
            UploadError::Misconfigured(format!("cannot create store root {}: {}", self.root.display(), e))
        })?;

        let path = self.table_path(name);
        if !path.exists() {
            OpenOptions::new()
                .create_new(true)
                .write(true)
                .open(&path)
                .map_err(|e| UploadError::Unreachable(format!("cannot create {}: {}", path.display(), e)))?;
            info!(table = name, "Created table");
        }

        Ok(TableHandle {
            name: name.to_string(),
        })
    }

    #[instrument(skip(self, artifact), fields(table = %table.name, rows = artifact.row_count()))]
    async fn append(
        &self,
        table: &TableHandle,
        artifact: TableArtifact,
    ) -> Result<AppendReceipt, UploadError> {
        let path = self.table_path(&table.name);
        if !path.exists() {
            return Err(UploadError::Rejected(format!("table '{}' does not exist", table.name)));
        }

        let (existing_header, row_count_before) = read_table(&path)
            .map_err(|e| UploadError::Unreachable(format!("cannot read {}: {}", path.display(), e)))?;

        if let Some(ref header) = existing_header {
            if header.as_slice() != artifact.header() {
                return Err(UploadError::Rejected(format!(
                    "header of '{}' is {:?}, artifact has {:?}",
                    table.name,
                    header,
                    artifact.header()
                )));
            }
        }

        let file = OpenOptions::new()
            .append(true)
            .open(&path)
            .map_err(|e| UploadError::Unreachable(format!("cannot open {}: {}", path.display(), e)))?;

        // From here on a failure may leave some rows behind.
        let ambiguous = |e: &dyn std::fmt::Display| {
            UploadError::Ambiguous(format!("append to {} interrupted: {}", path.display(), e))
        };

        let mut writer = csv::Writer::from_writer(file);
        if existing_header.is_none() {
            writer.write_record(artifact.header()).map_err(|e| ambiguous(&e))?;
        }
        for row in artifact.rows() {
            writer.write_record(row).map_err(|e| ambiguous(&e))?;
        }
        let file = writer.into_inner().map_err(|e| ambiguous(&e))?;
        file.sync_data().map_err(|e| ambiguous(&e))?;

        let (_, row_count_after) = read_table(&path).map_err(|e| ambiguous(&e))?;

        debug!(row_count_before, row_count_after, "Append confirmed");

        Ok(AppendReceipt {
            row_count_before,
            row_count_after,
            column_count: artifact.column_count(),
        })
    }
}
