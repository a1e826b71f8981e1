//! tabsync ingest library
//!
//! Idempotent ingestion of tab-delimited release files into an append-only
//! table store.
//!
//! # Pipeline
//!
//! - **Sources**: find archive links on a release page, download and extract
//!   them ([`sources`])
//! - **Discovery**: list extracted files not yet in the [`ledger::Ledger`]
//! - **Normalization**: split rows on tabs, clean escapes, drop rows whose
//!   width differs from the header ([`normalize`])
//! - **Upload**: append each file's table to a [`store::RemoteTableStore`]
//!   and record it only after the store confirms
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use tabsync_ingest::{
//!     alert::LogAlertSink, config::IngestOptions, ledger::Ledger, store::FsTableStore,
//!     IngestionOrchestrator,
//! };
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let options = IngestOptions::from_env()?;
//!     let ledger = Ledger::open(&options.ledger_path)?;
//!     let store = Arc::new(FsTableStore::new(&options.store_path));
//!     let mut orchestrator =
//!         IngestionOrchestrator::new(options, store, Arc::new(LogAlertSink), ledger);
//!     let report = orchestrator.run().await?;
//!     println!("{} files uploaded", report.uploaded());
//!     Ok(())
//! }
//! ```

#![deny(clippy::unwrap_used, clippy::expect_used)]

pub mod alert;
pub mod commands;
pub mod config;
pub mod discovery;
pub mod error;
pub mod ledger;
pub mod normalize;
pub mod orchestrator;
pub mod report;
pub mod sources;
pub mod store;
pub mod table;

// Re-export commonly used types
pub use error::{IngestError, Result};
pub use orchestrator::IngestionOrchestrator;
pub use report::{FileOutcome, RunReport};

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// tabsync - incremental loader for tab-delimited data releases
#[derive(Parser, Debug)]
#[command(name = "tabsync")]
#[command(author, version, about, long_about = None)]
#[command(arg_required_else_help = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Debug logging on the console
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(flatten)]
    pub paths: PathArgs,
}

/// Overrides for options otherwise read from `TABSYNC_*` variables
#[derive(Args, Debug, Default, Clone)]
pub struct PathArgs {
    /// Directory archives are extracted into and scanned for release files
    #[arg(long, global = true)]
    pub extract_path: Option<PathBuf>,

    /// Ledger of ingested files
    #[arg(long, global = true)]
    pub ledger_path: Option<PathBuf>,

    /// Root of the table store
    #[arg(long, global = true)]
    pub store_path: Option<PathBuf>,

    /// Prefix for table names
    #[arg(long, global = true)]
    pub table_prefix: Option<String>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Discover, download and extract new archives, then ingest them
    Run {
        /// Release page listing the archives
        #[arg(long, env = "TABSYNC_SOURCE_URL")]
        source_url: Option<String>,

        /// Directory archives are downloaded into
        #[arg(long)]
        download_path: Option<PathBuf>,
    },

    /// Ingest files already present in the extraction directory
    Ingest,

    /// Show ledger size and pending files
    Status,
}
