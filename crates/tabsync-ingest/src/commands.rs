//! Command implementations behind the `tabsync` binary

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tabsync_common::logging::LogConfig;
use tracing::{info, warn};

use crate::alert::{AlertSink, LogAlertSink, WebhookAlertSink};
use crate::config::IngestOptions;
use crate::discovery::TableGroup;
use crate::ledger::Ledger;
use crate::orchestrator::IngestionOrchestrator;
use crate::report::RunReport;
use crate::sources::{ArchiveFetcher, HtmlLinkDiscovery, HttpArchiveFetcher, LinkDiscovery};
use crate::store::FsTableStore;
use crate::PathArgs;

/// Apply command-line overrides on top of environment options
pub fn apply_overrides(mut options: IngestOptions, paths: &PathArgs) -> IngestOptions {
    if let Some(ref path) = paths.extract_path {
        options = options.with_extract_path(path);
    }
    if let Some(ref path) = paths.ledger_path {
        options = options.with_ledger_path(path);
    }
    if let Some(ref path) = paths.store_path {
        options = options.with_store_path(path);
    }
    if let Some(ref prefix) = paths.table_prefix {
        options = options.with_table_name_prefix(prefix);
    }
    options
}

/// Point alerts at the directory logs are actually written to
pub fn align_log_dir(options: IngestOptions, log_config: &LogConfig) -> IngestOptions {
    let dir = log_config
        .output
        .includes_file()
        .then(|| log_config.log_dir.clone());
    options.with_log_dir(dir)
}

fn alert_sink(options: &IngestOptions) -> anyhow::Result<Arc<dyn AlertSink>> {
    match options.alert_webhook_url {
        Some(ref url) => {
            let sink = WebhookAlertSink::new(url, Duration::from_secs(options.alert_timeout_secs))
                .context("Failed to build alert webhook client")?;
            Ok(Arc::new(sink))
        },
        None => {
            warn!("No alert webhook configured, alerts are only logged");
            Ok(Arc::new(LogAlertSink))
        },
    }
}

fn orchestrator(options: IngestOptions) -> anyhow::Result<IngestionOrchestrator> {
    let ledger = Ledger::open(&options.ledger_path)
        .with_context(|| format!("Failed to open ledger {}", options.ledger_path.display()))?;
    let store = Arc::new(FsTableStore::new(&options.store_path));
    let alerts = alert_sink(&options)?;
    Ok(IngestionOrchestrator::new(options, store, alerts, ledger))
}

/// Ingest the extraction directory as it is
pub async fn ingest(options: IngestOptions) -> anyhow::Result<RunReport> {
    options.validate()?;
    let mut orchestrator = orchestrator(options)?;
    let report = orchestrator.run().await.context("Ingestion run aborted")?;
    Ok(report)
}

/// Fetch new archives from the release page, then ingest
pub async fn run(
    mut options: IngestOptions,
    source_url: Option<String>,
    download_path: Option<PathBuf>,
) -> anyhow::Result<RunReport> {
    if let Some(url) = source_url {
        options.source_url = url;
    }
    if let Some(path) = download_path {
        options.download_path = path;
    }
    options.validate()?;

    let timeout = Duration::from_secs(options.http_timeout_secs);
    let discovery = HtmlLinkDiscovery::new(&options.link_selector, timeout)?;
    let links = discovery
        .discover(&options.source_url)
        .await
        .with_context(|| format!("Failed to list archives at {}", options.source_url))?;

    let fetcher = HttpArchiveFetcher::new(timeout)?;
    let downloaded = fetcher
        .download(&links, &options.download_path)
        .await
        .context("Failed to download archives")?;
    let extracted = fetcher
        .extract(&options.download_path, &options.extract_path)
        .await
        .context("Failed to extract archives")?;
    info!(
        links = links.len(),
        downloaded = downloaded.len(),
        extracted = extracted.len(),
        "Sources up to date"
    );

    ingest(options).await
}

/// Ledger size and pending files
#[derive(Debug)]
pub struct Status {
    pub ledger_path: PathBuf,
    pub ingested: usize,
    pub pending: Vec<TableGroup>,
}

impl Status {
    pub fn pending_files(&self) -> usize {
        self.pending.iter().map(|g| g.files.len()).sum()
    }
}

pub fn status(options: IngestOptions) -> anyhow::Result<Status> {
    options.validate()?;
    let orchestrator = orchestrator(options)?;
    let pending = orchestrator.pending()?;

    Ok(Status {
        ledger_path: orchestrator.ledger().path().to_path_buf(),
        ingested: orchestrator.ledger().len(),
        pending,
    })
}
