//! Rectangular table artifacts handed to the table store

use std::path::Path;

use tabsync_common::Record;

use crate::error::Result;

/// A row whose width differs from the header's.
///
/// [`crate::normalize::RowNormalizer`] never lets such a row through, so this
/// signals a broken invariant rather than bad input data.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("schema mismatch at row {row}: expected {expected} fields, found {actual}")]
pub struct SchemaMismatch {
    pub row: usize,
    pub expected: usize,
    pub actual: usize,
}

/// Header plus rows, every row exactly as wide as the header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableArtifact {
    header: Record,
    rows: Vec<Record>,
}

impl TableArtifact {
    pub fn header(&self) -> &[String] {
        &self.header
    }

    pub fn rows(&self) -> &[Record] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.header.len()
    }

    /// Write as comma-delimited CSV, header first
    pub fn write_csv(&self, path: &Path) -> Result<()> {
        let mut writer = csv::Writer::from_path(path)?;
        writer.write_record(&self.header)?;
        for row in &self.rows {
            writer.write_record(row)?;
        }
        writer.flush()?;
        Ok(())
    }
}

/// Assembles validated rows into a [`TableArtifact`].
pub struct TableBuilder;

impl TableBuilder {
    pub fn build(
        header: Record,
        rows: Vec<Record>,
    ) -> std::result::Result<TableArtifact, SchemaMismatch> {
        let expected = header.len();
        if let Some((row, actual)) = rows
            .iter()
            .map(Vec::len)
            .enumerate()
            .find(|(_, len)| *len != expected)
        {
            return Err(SchemaMismatch {
                row,
                expected,
                actual,
            });
        }

        Ok(TableArtifact { header, rows })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn rec(fields: &[&str]) -> Record {
        fields.iter().map(|f| f.to_string()).collect()
    }

    #[test]
    fn test_build_accepts_rectangular_rows() {
        let table = TableBuilder::build(
            rec(&["a", "b"]),
            vec![rec(&["1", "2"]), rec(&["3", "4"])],
        )
        .unwrap();

        assert_eq!(table.column_count(), 2);
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.rows()[1], rec(&["3", "4"]));
    }

    #[test]
    fn test_build_rejects_ragged_row() {
        let err = TableBuilder::build(
            rec(&["a", "b", "c"]),
            vec![rec(&["1", "2", "3"]), rec(&["x", "y"])],
        )
        .unwrap_err();

        assert_eq!(
            err,
            SchemaMismatch {
                row: 1,
                expected: 3,
                actual: 2,
            }
        );
    }

    #[test]
    fn test_csv_quotes_embedded_delimiters() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sub.csv");
        let table = TableBuilder::build(
            rec(&["name", "note"]),
            vec![rec(&["Acme, Inc.", "said \"hi\""])],
        )
        .unwrap();

        table.write_csv(&path).unwrap();
        let csv = std::fs::read_to_string(&path).unwrap();
        assert_eq!(csv, "name,note\n\"Acme, Inc.\",\"said \"\"hi\"\"\"\n");
    }

    #[test]
    fn test_write_csv_to_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sub.csv");
        let table = TableBuilder::build(rec(&["a"]), vec![rec(&["1"])]).unwrap();

        table.write_csv(&path).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "a\n1\n");
    }
}
