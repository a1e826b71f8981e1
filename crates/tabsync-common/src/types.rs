//! Common types used across tabsync

use crate::error::{Result, TabsyncError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// One parsed row: an ordered sequence of fields.
pub type Record = Vec<String>;

/// A release file found in the extraction tree.
///
/// The identifier is the path exactly as discovered, so it stays stable
/// across runs as long as the tree is walked from the same root. Several
/// files (one per periodic release) usually share a table name.
///
/// # Examples
///
/// ```
/// use tabsync_common::types::SourceFile;
///
/// let file = SourceFile::new("./unzip_files/2011q3_notes/txt.tsv", "").unwrap();
/// assert_eq!(file.id(), "./unzip_files/2011q3_notes/txt.tsv");
/// assert_eq!(file.table_name(), "txt");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceFile {
    path: PathBuf,
    id: String,
    table_name: String,
}

impl SourceFile {
    /// Build a source file from its path, deriving the table name from the
    /// file name (everything before the first `.`) with `table_prefix` prepended.
    pub fn new(path: impl Into<PathBuf>, table_prefix: &str) -> Result<Self> {
        let path = path.into();
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| {
                TabsyncError::InvalidSourceFile(format!(
                    "no UTF-8 file name in {}",
                    path.display()
                ))
            })?;

        let stem = file_name.split('.').next().unwrap_or_default();
        if stem.is_empty() {
            return Err(TabsyncError::InvalidSourceFile(format!(
                "cannot derive a table name from {}",
                path.display()
            )));
        }

        let table_name = format!("{}{}", table_prefix, stem);
        let id = path.to_string_lossy().into_owned();

        Ok(Self {
            path,
            id,
            table_name,
        })
    }

    /// Ledger identifier of this file
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Filesystem location
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Logical table the file appends to
    pub fn table_name(&self) -> &str {
        &self.table_name
    }
}

impl std::fmt::Display for SourceFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.id)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_table_name_stops_at_first_dot() {
        let file = SourceFile::new("/data/2022_04_notes/cal.backup.tsv", "").unwrap();
        assert_eq!(file.table_name(), "cal");
    }

    #[test]
    fn test_table_prefix_is_prepended() {
        let file = SourceFile::new("/data/2022q1/num.tsv", "sec_").unwrap();
        assert_eq!(file.table_name(), "sec_num");
        assert_eq!(file.id(), "/data/2022q1/num.tsv");
    }

    #[test]
    fn test_hidden_file_is_rejected() {
        let err = SourceFile::new("/data/2022q1/.tsv", "").unwrap_err();
        assert!(matches!(err, TabsyncError::InvalidSourceFile(_)));
    }

    #[test]
    fn test_directory_root_is_rejected() {
        assert!(SourceFile::new("/", "").is_err());
    }
}
