//! tabsync - main entry point

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tabsync_common::logging::{init_logging, LogConfig, LogLevel, LogOutput};
use tabsync_ingest::commands::{self, align_log_dir, apply_overrides};
use tabsync_ingest::config::{IngestOptions, DEFAULT_LOG_DIR};
use tabsync_ingest::{Cli, Commands, RunReport};
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let options = IngestOptions::from_env().context("Failed to load configuration")?;
    let options = apply_overrides(options, &cli.paths);

    // Skipped-row alerts point operators at these files
    let log_config = LogConfig::builder()
        .level(if cli.verbose { LogLevel::Debug } else { LogLevel::Info })
        .output(LogOutput::Both)
        .log_dir(
            options
                .log_dir
                .clone()
                .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_DIR)),
        )
        .log_file_prefix("tabsync")
        .build()
        .merge_env()
        .context("Invalid logging configuration")?;
    let _guard = init_logging(&log_config)?;
    let options = align_log_dir(options, &log_config);

    match cli.command {
        Commands::Run {
            source_url,
            download_path,
        } => {
            let report = commands::run(options, source_url, download_path).await?;
            finish(&report)
        },
        Commands::Ingest => {
            let report = commands::ingest(options).await?;
            finish(&report)
        },
        Commands::Status => {
            let status = commands::status(options)?;
            println!(
                "Ledger: {} ({} files ingested)",
                status.ledger_path.display(),
                status.ingested
            );
            println!(
                "Pending: {} files in {} tables",
                status.pending_files(),
                status.pending.len()
            );
            for group in &status.pending {
                println!("  {} ({} files)", group.table_name, group.files.len());
                for file in &group.files {
                    println!("    {}", file.id());
                }
            }
            Ok(())
        },
    }
}

fn finish(report: &RunReport) -> anyhow::Result<()> {
    info!(
        run_id = %report.run_id,
        uploaded = report.uploaded(),
        empty = report.empty(),
        failed = report.failed(),
        rows = report.rows_uploaded(),
        "Run summary"
    );

    if report.is_success() {
        return Ok(());
    }

    for file in &report.files {
        if let tabsync_ingest::FileOutcome::Failed { ref reason } = file.outcome {
            error!(path = %file.file_id, reason = %reason, "File not ingested");
        }
    }
    anyhow::bail!("{} file(s) failed to ingest and will be retried next run", report.failed())
}
