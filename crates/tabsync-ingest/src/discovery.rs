//! Release file discovery
//!
//! Walks the extraction tree, keeps release files that are not yet in the
//! ledger, and groups them by target table in a deterministic order.

use std::collections::BTreeMap;
use std::path::Path;

use regex::Regex;
use tabsync_common::SourceFile;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::error::Result;
use crate::ledger::Ledger;

/// Decides which file names are release files.
#[derive(Debug, Clone)]
pub struct FileFilter {
    extension: String,
    exclude: Vec<Regex>,
}

impl FileFilter {
    pub fn new(extension: impl Into<String>, exclude_patterns: &[String]) -> Result<Self> {
        let exclude = exclude_patterns
            .iter()
            .map(|pattern| Regex::new(pattern))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(Self {
            extension: extension.into(),
            exclude,
        })
    }

    pub fn accepts(&self, file_name: &str) -> bool {
        file_name.ends_with(&self.extension) && !self.exclude.iter().any(|re| re.is_match(file_name))
    }
}

/// Pending files of one table, oldest release first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableGroup {
    pub table_name: String,
    pub files: Vec<SourceFile>,
}

/// Find release files under `root` that the ledger has not recorded.
///
/// Groups come back ordered by table name; files inside a group are sorted
/// by full path, which puts periodic releases in chronological order when
/// the period is encoded in the directory name.
pub fn discover_pending(
    root: &Path,
    filter: &FileFilter,
    table_prefix: &str,
    ledger: &Ledger,
) -> Result<Vec<TableGroup>> {
    if !root.exists() {
        warn!(root = %root.display(), "Extraction directory does not exist, nothing to ingest");
        return Ok(Vec::new());
    }

    let mut groups: BTreeMap<String, Vec<SourceFile>> = BTreeMap::new();
    let mut already_ingested = 0usize;

    for entry in WalkDir::new(root) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }

        let Some(file_name) = entry.file_name().to_str() else {
            warn!(path = %entry.path().display(), "Skipping file with non UTF-8 name");
            continue;
        };
        if !filter.accepts(file_name) {
            continue;
        }

        let file = match SourceFile::new(entry.path(), table_prefix) {
            Ok(file) => file,
            Err(e) => {
                warn!(path = %entry.path().display(), error = %e, "Skipping release file");
                continue;
            },
        };

        if !Ledger::is_recordable(file.id()) {
            warn!(path = ?file.id(), "Skipping file whose path cannot be recorded in the ledger");
            continue;
        }

        if ledger.contains(file.id()) {
            already_ingested += 1;
            continue;
        }

        debug!(path = %file.id(), table = %file.table_name(), "Discovered pending file");
        groups
            .entry(file.table_name().to_string())
            .or_default()
            .push(file);
    }

    let groups: Vec<TableGroup> = groups
        .into_iter()
        .map(|(table_name, mut files)| {
            files.sort_by(|a, b| a.id().cmp(b.id()));
            TableGroup { table_name, files }
        })
        .collect();

    info!(
        tables = groups.len(),
        pending = groups.iter().map(|g| g.files.len()).sum::<usize>(),
        already_ingested,
        "Discovery complete"
    );

    Ok(groups)
}
