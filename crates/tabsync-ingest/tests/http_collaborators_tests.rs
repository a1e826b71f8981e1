//! HTTP-facing collaborators against a mock server

use std::time::Duration;

use anyhow::Result;
use tabsync_ingest::alert::{AlertSink, WebhookAlertSink};
use tabsync_ingest::sources::{HtmlLinkDiscovery, LinkDiscovery};
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const RELEASE_PAGE: &str = r#"
<html><body>
  <table class="list">
    <tr><td class="views-field views-field-field-display-title">
      <a href="/files/2022q2.zip">2022 Q2</a></td></tr>
    <tr><td class="views-field views-field-field-display-title">
      <a href="/files/2022q1.zip">2022 Q1</a></td></tr>
    <tr><td class="views-field views-field-field-display-title">
      <a href="/files/2022q1.zip">2022 Q1 (mirror)</a></td></tr>
  </table>
</body></html>
"#;

#[tokio::test]
async fn test_webhook_posts_text_payload() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/hooks/alerts"))
        .and(header("content-type", "application/json"))
        .and(body_string_contains("Skipped row indices: [3]"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let sink = WebhookAlertSink::new(format!("{}/hooks/alerts", server.uri()), Duration::from_secs(5))?;
    assert!(sink.notify("Skipped row indices: [3]").await);

    Ok(())
}

#[tokio::test]
async fn test_webhook_reports_refusal() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let sink = WebhookAlertSink::new(server.uri(), Duration::from_secs(5))?;
    assert!(!sink.notify("hello").await);

    Ok(())
}

#[tokio::test]
async fn test_webhook_reports_unreachable_host() -> Result<()> {
    let server = MockServer::start().await;
    let url = format!("{}/hooks", server.uri());
    drop(server);

    let sink = WebhookAlertSink::new(url, Duration::from_secs(2))?;
    assert!(!sink.notify("hello").await);

    Ok(())
}

#[tokio::test]
async fn test_link_discovery_reads_release_page() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/data/releases.html"))
        .respond_with(ResponseTemplate::new(200).set_body_string(RELEASE_PAGE))
        .mount(&server)
        .await;

    let discovery = HtmlLinkDiscovery::new(
        "td.views-field-field-display-title a",
        Duration::from_secs(5),
    )?;
    let links = discovery
        .discover(&format!("{}/data/releases.html", server.uri()))
        .await?;

    let paths: Vec<&str> = links.iter().map(|u| u.path()).collect();
    assert_eq!(paths, vec!["/files/2022q2.zip", "/files/2022q1.zip"]);

    Ok(())
}

#[tokio::test]
async fn test_link_discovery_fails_on_http_error() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let discovery = HtmlLinkDiscovery::new("a", Duration::from_secs(5))?;
    assert!(discovery.discover(&server.uri()).await.is_err());

    Ok(())
}
