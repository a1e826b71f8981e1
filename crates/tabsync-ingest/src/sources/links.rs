//! Archive link discovery on the release page

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use scraper::{Html, Selector};
use tracing::{debug, info};
use url::Url;

use crate::error::{IngestError, Result};

/// Lists downloadable archives published at a source page
#[async_trait]
pub trait LinkDiscovery: Send + Sync {
    /// Archive URLs in page order
    async fn discover(&self, source_url: &str) -> Result<Vec<Url>>;
}

/// Scrapes archive links out of an HTML page with a CSS selector.
pub struct HtmlLinkDiscovery {
    client: Client,
    selector: String,
}

impl HtmlLinkDiscovery {
    pub fn new(selector: impl Into<String>, timeout: Duration) -> Result<Self> {
        let selector = selector.into();
        // Fail at construction rather than on the first page
        parse_selector(&selector)?;

        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("tabsync/", env!("CARGO_PKG_VERSION"), " (data ingestion)"))
            .build()?;

        Ok(Self { client, selector })
    }
}

#[async_trait]
impl LinkDiscovery for HtmlLinkDiscovery {
    async fn discover(&self, source_url: &str) -> Result<Vec<Url>> {
        info!(url = source_url, "Fetching release page");

        let base = Url::parse(source_url)?;
        let html = self
            .client
            .get(base.clone())
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        let links = extract_archive_links(&html, &base, &self.selector)?;
        info!(count = links.len(), "Discovered archive links");
        Ok(links)
    }
}

fn parse_selector(selector: &str) -> Result<Selector> {
    Selector::parse(selector)
        .map_err(|e| IngestError::Validation(format!("invalid link selector '{}': {}", selector, e)))
}

/// Resolve the `href` of every selected anchor against `base`, keeping
/// unique `.zip` links in document order.
pub fn extract_archive_links(html: &str, base: &Url, selector: &str) -> Result<Vec<Url>> {
    let selector = parse_selector(selector)?;
    let document = Html::parse_document(html);

    let mut links: Vec<Url> = Vec::new();
    for element in document.select(&selector) {
        let Some(href) = element.value().attr("href") else {
            continue;
        };

        let url = base.join(href.trim())?;
        if !url.path().to_ascii_lowercase().ends_with(".zip") {
            debug!(%url, "Ignoring non-archive link");
            continue;
        }
        if !links.contains(&url) {
            links.push(url);
        }
    }

    Ok(links)
}
