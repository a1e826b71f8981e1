//! Ingestion configuration
//!
//! Options are read from `TABSYNC_*` environment variables (a `.env` file is
//! honored) and can be overridden from the command line.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use tabsync_common::TabsyncError;

// ============================================================================
// Configuration Constants
// ============================================================================

/// Release page listing the quarterly financial statement archives.
pub const DEFAULT_SOURCE_URL: &str =
    "https://www.sec.gov/dera/data/financial-statement-and-notes-data-set.html";

pub const DEFAULT_DOWNLOAD_PATH: &str = "./zip_files";
pub const DEFAULT_EXTRACT_PATH: &str = "./unzip_files";
pub const DEFAULT_WORK_PATH: &str = "./datasets";
pub const DEFAULT_LEDGER_PATH: &str = "./uploaded_file_list.txt";
pub const DEFAULT_STORE_PATH: &str = "./table_store";
pub const DEFAULT_LOG_DIR: &str = "./logs";

/// Extension of release files inside the archives.
pub const DEFAULT_FILE_EXTENSION: &str = ".tsv";

/// Notebook checkpoints and editor lock/swap files.
pub const DEFAULT_EXCLUDE_PATTERNS: &[&str] = &["checkpoint", r"^~", r"^\.~lock\.", r"\.swp$"];

/// Anchors of the download table on the release page.
pub const DEFAULT_LINK_SELECTOR: &str = "td.views-field-field-display-title a";

pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 600;

/// Alerts are small; a slow webhook should not hold up the run.
pub const DEFAULT_ALERT_TIMEOUT_SECS: u64 = 30;

/// Consecutive upload failures after which the run is aborted.
pub const DEFAULT_MAX_CONSECUTIVE_UPLOAD_FAILURES: u32 = 3;

/// Options for one ingestion run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestOptions {
    /// Page listing downloadable release archives
    pub source_url: String,

    /// Where archives are downloaded
    pub download_path: PathBuf,

    /// Where archives are extracted; the tree scanned for release files
    pub extract_path: PathBuf,

    /// Where normalized tables are staged as CSV before upload
    pub work_path: PathBuf,

    /// Newline-delimited list of ingested file identifiers
    pub ledger_path: PathBuf,

    /// Prepended to every table name derived from a file name
    pub table_name_prefix: String,

    /// Only files whose name ends with this are ingested
    pub file_extension: String,

    /// Regexes matched against file names; matching files are ignored
    pub exclude_patterns: Vec<String>,

    /// Root of the filesystem table store
    pub store_path: PathBuf,

    /// Webhook receiving skipped-row alerts (alerts are only logged when unset)
    pub alert_webhook_url: Option<String>,

    /// Directory holding the per-row logs alerts refer to; `None` when logs
    /// are not written to files
    pub log_dir: Option<PathBuf>,

    /// Timeout for every HTTP call, in seconds
    pub http_timeout_secs: u64,

    /// Timeout for alert webhook calls, in seconds
    pub alert_timeout_secs: u64,

    /// CSS selector for archive links on the source page
    pub link_selector: String,

    /// Abort the run after this many upload failures in a row
    pub max_consecutive_upload_failures: u32,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            source_url: DEFAULT_SOURCE_URL.to_string(),
            download_path: PathBuf::from(DEFAULT_DOWNLOAD_PATH),
            extract_path: PathBuf::from(DEFAULT_EXTRACT_PATH),
            work_path: PathBuf::from(DEFAULT_WORK_PATH),
            ledger_path: PathBuf::from(DEFAULT_LEDGER_PATH),
            table_name_prefix: String::new(),
            file_extension: DEFAULT_FILE_EXTENSION.to_string(),
            exclude_patterns: DEFAULT_EXCLUDE_PATTERNS
                .iter()
                .map(|p| p.to_string())
                .collect(),
            store_path: PathBuf::from(DEFAULT_STORE_PATH),
            alert_webhook_url: None,
            log_dir: Some(PathBuf::from(DEFAULT_LOG_DIR)),
            http_timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
            alert_timeout_secs: DEFAULT_ALERT_TIMEOUT_SECS,
            link_selector: DEFAULT_LINK_SELECTOR.to_string(),
            max_consecutive_upload_failures: DEFAULT_MAX_CONSECUTIVE_UPLOAD_FAILURES,
        }
    }
}

impl IngestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load options from the environment on top of the defaults
    ///
    /// Environment variables:
    /// - `TABSYNC_SOURCE_URL`, `TABSYNC_DOWNLOAD_PATH`, `TABSYNC_EXTRACT_PATH`,
    ///   `TABSYNC_WORK_PATH`, `TABSYNC_LEDGER_PATH`, `TABSYNC_STORE_PATH`,
    ///   `TABSYNC_LOG_DIR`
    /// - `TABSYNC_TABLE_PREFIX`, `TABSYNC_FILE_EXTENSION`
    /// - `TABSYNC_EXCLUDE_PATTERNS`: comma-separated regexes
    /// - `TABSYNC_ALERT_WEBHOOK_URL`
    /// - `TABSYNC_HTTP_TIMEOUT_SECS`, `TABSYNC_ALERT_TIMEOUT_SECS`,
    ///   `TABSYNC_MAX_UPLOAD_FAILURES`
    /// - `TABSYNC_LINK_SELECTOR`
    pub fn from_env() -> Result<Self, TabsyncError> {
        dotenvy::dotenv().ok();

        let mut options = Self::default();

        if let Ok(url) = std::env::var("TABSYNC_SOURCE_URL") {
            options.source_url = url;
        }
        if let Ok(path) = std::env::var("TABSYNC_DOWNLOAD_PATH") {
            options.download_path = PathBuf::from(path);
        }
        if let Ok(path) = std::env::var("TABSYNC_EXTRACT_PATH") {
            options.extract_path = PathBuf::from(path);
        }
        if let Ok(path) = std::env::var("TABSYNC_WORK_PATH") {
            options.work_path = PathBuf::from(path);
        }
        if let Ok(path) = std::env::var("TABSYNC_LEDGER_PATH") {
            options.ledger_path = PathBuf::from(path);
        }
        if let Ok(path) = std::env::var("TABSYNC_STORE_PATH") {
            options.store_path = PathBuf::from(path);
        }
        if let Ok(path) = std::env::var("TABSYNC_LOG_DIR") {
            options.log_dir = Some(PathBuf::from(path));
        }
        if let Ok(prefix) = std::env::var("TABSYNC_TABLE_PREFIX") {
            options.table_name_prefix = prefix;
        }
        if let Ok(ext) = std::env::var("TABSYNC_FILE_EXTENSION") {
            options.file_extension = ext;
        }
        if let Ok(patterns) = std::env::var("TABSYNC_EXCLUDE_PATTERNS") {
            options.exclude_patterns = patterns
                .split(',')
                .map(|p| p.trim().to_string())
                .filter(|p| !p.is_empty())
                .collect();
        }
        if let Ok(url) = std::env::var("TABSYNC_ALERT_WEBHOOK_URL") {
            options.alert_webhook_url = Some(url).filter(|u| !u.is_empty());
        }
        if let Ok(selector) = std::env::var("TABSYNC_LINK_SELECTOR") {
            options.link_selector = selector;
        }
        if let Ok(secs) = std::env::var("TABSYNC_HTTP_TIMEOUT_SECS") {
            options.http_timeout_secs = secs.parse().map_err(|_| {
                TabsyncError::config(format!("TABSYNC_HTTP_TIMEOUT_SECS is not a number: {}", secs))
            })?;
        }
        if let Ok(secs) = std::env::var("TABSYNC_ALERT_TIMEOUT_SECS") {
            options.alert_timeout_secs = secs.parse().map_err(|_| {
                TabsyncError::config(format!("TABSYNC_ALERT_TIMEOUT_SECS is not a number: {}", secs))
            })?;
        }
        if let Ok(max) = std::env::var("TABSYNC_MAX_UPLOAD_FAILURES") {
            options.max_consecutive_upload_failures = max.parse().map_err(|_| {
                TabsyncError::config(format!("TABSYNC_MAX_UPLOAD_FAILURES is not a number: {}", max))
            })?;
        }

        Ok(options)
    }

    pub fn with_extract_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.extract_path = path.into();
        self
    }

    pub fn with_work_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.work_path = path.into();
        self
    }

    pub fn with_ledger_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.ledger_path = path.into();
        self
    }

    pub fn with_store_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.store_path = path.into();
        self
    }

    pub fn with_table_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.table_name_prefix = prefix.into();
        self
    }

    pub fn with_log_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.log_dir = dir;
        self
    }

    pub fn with_alert_timeout_secs(mut self, secs: u64) -> Self {
        self.alert_timeout_secs = secs;
        self
    }

    pub fn with_max_consecutive_upload_failures(mut self, max: u32) -> Self {
        self.max_consecutive_upload_failures = max;
        self
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), TabsyncError> {
        if self.source_url.is_empty() {
            return Err(TabsyncError::config("Source URL cannot be empty"));
        }

        if !self.file_extension.starts_with('.') || self.file_extension.len() < 2 {
            return Err(TabsyncError::config(format!(
                "File extension must look like '.tsv', got '{}'",
                self.file_extension
            )));
        }

        if self.http_timeout_secs == 0 {
            return Err(TabsyncError::config("HTTP timeout must be greater than 0"));
        }

        if self.alert_timeout_secs == 0 {
            return Err(TabsyncError::config("Alert timeout must be greater than 0"));
        }

        if self.max_consecutive_upload_failures == 0 {
            return Err(TabsyncError::config(
                "Max consecutive upload failures must be greater than 0",
            ));
        }

        if self.link_selector.trim().is_empty() {
            return Err(TabsyncError::config("Link selector cannot be empty"));
        }

        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options_are_valid() {
        let options = IngestOptions::default();
        assert!(options.validate().is_ok());
        assert_eq!(options.file_extension, ".tsv");
        assert_eq!(options.max_consecutive_upload_failures, 3);
        assert!(options.alert_webhook_url.is_none());
        assert_eq!(options.alert_timeout_secs, DEFAULT_ALERT_TIMEOUT_SECS);
    }

    #[test]
    fn test_validate_rejects_zero_alert_timeout() {
        let options = IngestOptions::default().with_alert_timeout_secs(0);
        assert!(matches!(options.validate(), Err(TabsyncError::Config(_))));
    }

    #[test]
    fn test_builder_setters() {
        let options = IngestOptions::new()
            .with_extract_path("/tmp/x")
            .with_ledger_path("/tmp/ledger.txt")
            .with_table_name_prefix("sec_")
            .with_max_consecutive_upload_failures(5);

        assert_eq!(options.extract_path, PathBuf::from("/tmp/x"));
        assert_eq!(options.ledger_path, PathBuf::from("/tmp/ledger.txt"));
        assert_eq!(options.table_name_prefix, "sec_");
        assert_eq!(options.max_consecutive_upload_failures, 5);
    }

    #[test]
    fn test_validate_rejects_bad_extension() {
        let mut options = IngestOptions::default();
        options.file_extension = "tsv".to_string();
        assert!(matches!(options.validate(), Err(TabsyncError::Config(_))));
    }

    #[test]
    fn test_validate_rejects_zero_failure_budget() {
        let options = IngestOptions::default().with_max_consecutive_upload_failures(0);
        assert!(options.validate().is_err());
    }
}
