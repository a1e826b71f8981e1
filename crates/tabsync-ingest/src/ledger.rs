//! Durable record of ingested source files
//!
//! On disk the ledger is a newline-delimited list of identifiers in the order
//! they were recorded; in memory it is a set. Appends are synced before
//! returning, so a recorded file is never re-uploaded after a crash. The
//! ledger has no locking: one run owns it for its whole duration.

use std::collections::HashSet;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::{IngestError, Result};

pub struct Ledger {
    path: PathBuf,
    entries: Vec<String>,
    index: HashSet<String>,
}

impl Ledger {
    /// Load the ledger at `path`, creating an empty one if it does not exist
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let wrap = |source| IngestError::Ledger {
            path: path.display().to_string(),
            source,
        };

        if !path.exists() {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent).map_err(wrap)?;
            }
            File::create(&path).map_err(wrap)?;
            info!(path = %path.display(), "Created empty ledger");
        }

        let content = std::fs::read_to_string(&path).map_err(wrap)?;

        let mut entries = Vec::new();
        let mut index = HashSet::new();
        for line in content.lines().map(str::trim).filter(|l| !l.is_empty()) {
            if index.insert(line.to_string()) {
                entries.push(line.to_string());
            }
        }

        debug!(path = %path.display(), entries = entries.len(), "Loaded ledger");

        Ok(Self {
            path,
            entries,
            index,
        })
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains(id)
    }

    /// Whether `id` reads back unchanged after a write and reload: one
    /// line, no surrounding whitespace.
    pub fn is_recordable(id: &str) -> bool {
        !id.is_empty() && !id.contains(['\n', '\r']) && id.trim() == id
    }

    /// Durably record `id`. Recording an identifier twice is a no-op.
    pub fn append(&mut self, id: &str) -> Result<()> {
        if !Self::is_recordable(id) {
            return Err(IngestError::Validation(format!(
                "identifier {:?} cannot be stored as a single ledger line",
                id
            )));
        }
        if self.contains(id) {
            debug!(id, "Already in ledger");
            return Ok(());
        }

        let wrap = |source| IngestError::Ledger {
            path: self.path.display().to_string(),
            source,
        };

        let mut file = OpenOptions::new()
            .append(true)
            .create(true)
            .open(&self.path)
            .map_err(wrap)?;
        writeln!(file, "{}", id).map_err(wrap)?;
        file.sync_data().map_err(wrap)?;

        self.index.insert(id.to_string());
        self.entries.push(id.to_string());
        info!(id, "Recorded in ledger");
        Ok(())
    }

    /// Identifiers in the order they were recorded
    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
