//! Skipped-row alerts
//!
//! Alerts are best effort: a sink reports whether the message was delivered
//! and never returns an error the pipeline would have to handle.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use tracing::{debug, warn};

use crate::error::Result;
use crate::normalize::SkipReport;

/// Destination for operator alerts
#[async_trait]
pub trait AlertSink: Send + Sync {
    /// Deliver `message`; returns whether delivery succeeded
    async fn notify(&self, message: &str) -> bool;
}

/// Posts `{"text": message}` to a chat webhook.
pub struct WebhookAlertSink {
    client: Client,
    url: String,
}

impl WebhookAlertSink {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("tabsync/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl AlertSink for WebhookAlertSink {
    async fn notify(&self, message: &str) -> bool {
        let response = self
            .client
            .post(&self.url)
            .json(&json!({ "text": message }))
            .send()
            .await;

        match response {
            Ok(resp) if resp.status().is_success() => {
                debug!(status = %resp.status(), "Alert delivered");
                true
            },
            Ok(resp) => {
                warn!(status = %resp.status(), "Alert webhook refused message");
                false
            },
            Err(e) => {
                warn!(error = %e, "Alert webhook unreachable");
                false
            },
        }
    }
}

/// Writes alerts to the log; used when no webhook is configured.
pub struct LogAlertSink;

#[async_trait]
impl AlertSink for LogAlertSink {
    async fn notify(&self, message: &str) -> bool {
        warn!(alert = %message, "Alert");
        true
    }
}

/// Message sent after a file was ingested with skipped rows
///
/// `log_dir` is where the per-row details were written; `None` when logs only
/// went to the console.
pub fn skipped_rows_message(file_id: &str, skipped: &SkipReport, log_dir: Option<&Path>) -> String {
    let indices = skipped
        .indices()
        .iter()
        .map(|i| i.to_string())
        .collect::<Vec<_>>()
        .join(", ");

    let details = match log_dir {
        Some(dir) => format!("The content of each skipped row is in the logs under {}", dir.display()),
        None => "The content of each skipped row was logged to the console only".to_string(),
    };

    format!(
        "Ingestion of {path} completed with {count} skipped row(s).\n\
         PATH: {path}\n\
         Skipped row indices: [{indices}]\n\
         {details}",
        path = file_id,
        count = skipped.len(),
        indices = indices,
        details = details,
    )
}
