//! Tab-delimited row normalization
//!
//! Splits each line of a release file on tabs, cleans escape sequences out of
//! every field, and keeps only the rows whose field count matches the header.
//! Rejected rows are collected in a [`SkipReport`] instead of aborting the file.

use std::path::Path;

use tabsync_common::Record;

use crate::error::Result;

/// Field delimiter of release files
pub const FIELD_DELIMITER: char = '\t';

/// A data row rejected because its field count differs from the header's.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkipEntry {
    /// 0-based position among the data rows (the header is not counted)
    pub index: usize,
    /// The row's fields after cleaning
    pub fields: Record,
}

/// All rows rejected from one file, in file order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SkipReport {
    entries: Vec<SkipEntry>,
}

impl SkipReport {
    pub fn entries(&self) -> &[SkipEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Data-row indices of every skipped row
    pub fn indices(&self) -> Vec<usize> {
        self.entries.iter().map(|entry| entry.index).collect()
    }
}

/// Result of normalizing one file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizedFile {
    header: Record,
    rows: Vec<Record>,
    skipped: SkipReport,
    total_rows: usize,
}

impl NormalizedFile {
    /// Column names; empty when the file had no lines at all
    pub fn header(&self) -> &[String] {
        &self.header
    }

    /// Retained data rows, each as wide as the header
    pub fn rows(&self) -> &[Record] {
        &self.rows
    }

    pub fn skipped(&self) -> &SkipReport {
        &self.skipped
    }

    /// Data rows considered, retained or not
    pub fn total_rows(&self) -> usize {
        self.total_rows
    }

    pub fn skipped_count(&self) -> usize {
        self.skipped.len()
    }

    /// Share of data rows skipped, in percent, rounded to 3 decimals.
    /// A file without data rows reports 0.
    pub fn skipped_percentage(&self) -> f64 {
        if self.total_rows == 0 {
            return 0.0;
        }
        let pct = self.skipped_count() as f64 / self.total_rows as f64 * 100.0;
        (pct * 1000.0).round() / 1000.0
    }

    /// True when the file had fewer than two lines
    pub fn is_empty(&self) -> bool {
        self.total_rows == 0
    }

    pub fn into_parts(self) -> (Record, Vec<Record>, SkipReport) {
        (self.header, self.rows, self.skipped)
    }
}

/// Stateless tab-delimited row normalizer.
pub struct RowNormalizer;

impl RowNormalizer {
    /// Normalize the complete, ordered lines of one file. Line 0 is the header.
    ///
    /// Lines may still carry their terminators; they are stripped per field.
    pub fn normalize<I, S>(raw_lines: I) -> NormalizedFile
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut lines = raw_lines.into_iter();

        let header = match lines.next() {
            Some(line) => split_record(line.as_ref()),
            None => return NormalizedFile::default(),
        };
        let width = header.len();

        let mut rows = Vec::new();
        let mut skipped = Vec::new();
        let mut total_rows = 0;

        for (index, line) in lines.enumerate() {
            total_rows += 1;
            let fields = split_record(line.as_ref());
            if fields.len() == width {
                rows.push(fields);
            } else {
                skipped.push(SkipEntry { index, fields });
            }
        }

        NormalizedFile {
            header,
            rows,
            skipped: SkipReport { entries: skipped },
            total_rows,
        }
    }

    /// Read a file as UTF-8 and normalize its lines
    pub fn normalize_file(path: &Path) -> Result<NormalizedFile> {
        let content = std::fs::read_to_string(path)?;
        Ok(Self::normalize(content.split_inclusive('\n')))
    }
}

/// Split one line on tabs and clean every field.
pub fn split_record(line: &str) -> Record {
    line.split(FIELD_DELIMITER).map(clean_field).collect()
}

/// Un-escape quotes, drop remaining backslashes, strip the line terminator.
pub fn clean_field(raw: &str) -> String {
    let field = raw.strip_suffix('\n').unwrap_or(raw);
    let field = field.strip_suffix('\r').unwrap_or(field);
    field
        .replace("\\\"", "\"")
        .replace("\\'", "'")
        .replace('\\', "")
}
