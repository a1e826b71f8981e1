//! tabsync Common Library
//!
//! Shared types, logging setup, and error handling for the tabsync workspace.
//!
//! # Overview
//!
//! - **Error Handling**: [`TabsyncError`] and the [`Result`] alias
//! - **Logging**: process-wide `tracing` subscriber setup ([`logging`])
//! - **Types**: source files and records shared by the ingestion pipeline
//!
//! # Example
//!
//! ```no_run
//! use tabsync_common::logging::{init_logging, LogConfig};
//! use tabsync_common::types::SourceFile;
//!
//! fn main() -> anyhow::Result<()> {
//!     init_logging(&LogConfig::from_env()?)?;
//!
//!     let file = SourceFile::new("./unzip_files/2022q1/sub.tsv", "sec_")?;
//!     assert_eq!(file.table_name(), "sec_sub");
//!     Ok(())
//! }
//! ```

#![deny(clippy::unwrap_used, clippy::expect_used)]

pub mod error;
pub mod logging;
pub mod types;

// Re-export commonly used types
pub use error::{Result, TabsyncError};
pub use types::{Record, SourceFile};
