//! Archive download and extraction
//!
//! Both steps are idempotent across runs: archives already on disk are not
//! downloaded again, and archives whose target folder exists are not
//! extracted again.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::Client;
use tracing::{info, warn};
use url::Url;
use walkdir::WalkDir;

use crate::error::{IngestError, Result};

/// Produces the extraction tree the orchestrator scans
#[async_trait]
pub trait ArchiveFetcher: Send + Sync {
    /// Download archives missing from `download_path`; returns new files
    async fn download(&self, links: &[Url], download_path: &Path) -> Result<Vec<PathBuf>>;

    /// Extract archives not yet extracted; returns new folders
    async fn extract(&self, download_path: &Path, extract_path: &Path) -> Result<Vec<PathBuf>>;
}

/// Downloads over HTTP(S) and extracts zip archives.
pub struct HttpArchiveFetcher {
    client: Client,
}

impl HttpArchiveFetcher {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("tabsync/", env!("CARGO_PKG_VERSION"), " (data ingestion)"))
            .build()?;

        Ok(Self { client })
    }

    /// Stream one file to `output_path` with a progress bar.
    ///
    /// Data lands in a `.part` file first so an interrupted download is
    /// never mistaken for a complete archive on the next run.
    async fn download_file(&self, url: &Url, output_path: &Path) -> Result<()> {
        let response = self.client.get(url.clone()).send().await?.error_for_status()?;
        let total_size = response.content_length().unwrap_or(0);

        let pb = ProgressBar::new(total_size);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{msg}\n{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {bytes}/{total_bytes} ({eta})")
                .map_err(|e| IngestError::Validation(e.to_string()))?
                .progress_chars("#>-"),
        );
        pb.set_message(format!("Downloading {}", display_name(output_path)));

        let partial = output_path.with_extension("part");
        let mut file = File::create(&partial)?;
        let mut downloaded = 0u64;
        let mut stream = response.bytes_stream();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk)?;
            downloaded += chunk.len() as u64;
            pb.set_position(downloaded);
        }
        file.sync_all()?;
        std::fs::rename(&partial, output_path)?;

        pb.finish_with_message(format!("Downloaded {}", display_name(output_path)));
        Ok(())
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Last path segment of an archive URL
fn archive_file_name(url: &Url) -> Option<String> {
    url.path_segments()?
        .next_back()
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
}

/// Extract one zip archive into `target`, removing `target` again on failure
pub fn extract_zip(archive: &Path, target: &Path) -> Result<()> {
    std::fs::create_dir_all(target)?;

    let result = File::open(archive)
        .map_err(IngestError::from)
        .and_then(|file| zip::ZipArchive::new(file).map_err(IngestError::from))
        .and_then(|mut zip| zip.extract(target).map_err(IngestError::from));

    if let Err(e) = result {
        if let Err(cleanup) = std::fs::remove_dir_all(target) {
            warn!(target = %target.display(), error = %cleanup, "Failed to remove partial extraction");
        }
        return Err(e);
    }
    Ok(())
}

#[async_trait]
impl ArchiveFetcher for HttpArchiveFetcher {
    async fn download(&self, links: &[Url], download_path: &Path) -> Result<Vec<PathBuf>> {
        std::fs::create_dir_all(download_path)?;

        let mut downloaded = Vec::new();
        for link in links {
            let Some(file_name) = archive_file_name(link) else {
                warn!(%link, "Link has no file name, skipping");
                continue;
            };

            let target = download_path.join(&file_name);
            if target.exists() {
                continue;
            }

            info!(file = %file_name, "Archive is ready to download");
            self.download_file(link, &target).await?;
            info!(file = %file_name, dir = %download_path.display(), "Archive downloaded");
            downloaded.push(target);
        }

        if !downloaded.is_empty() {
            info!(count = downloaded.len(), "Downloaded new archives");
        }
        Ok(downloaded)
    }

    async fn extract(&self, download_path: &Path, extract_path: &Path) -> Result<Vec<PathBuf>> {
        if !download_path.exists() {
            return Ok(Vec::new());
        }

        let mut extracted = Vec::new();
        for entry in WalkDir::new(download_path).sort_by_file_name() {
            let entry = entry?;
            let Some(name) = entry.file_name().to_str() else {
                continue;
            };
            if !entry.file_type().is_file() || !name.to_ascii_lowercase().ends_with(".zip") {
                continue;
            }

            let folder = name.split('.').next().unwrap_or(name);
            let target = extract_path.join(folder);
            if target.exists() {
                continue;
            }

            extract_zip(entry.path(), &target)?;
            info!(archive = name, target = %target.display(), "Archive extracted");
            extracted.push(target);
        }

        Ok(extracted)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn zip_bytes(files: &[(&str, &str)]) -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
        for (name, content) in files {
            writer
                .start_file(*name, zip::write::FileOptions::default())
                .unwrap();
            writer.write_all(content.as_bytes()).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    #[test]
    fn test_archive_file_name() {
        let url = Url::parse("https://example.com/files/2022_04_notes.zip").unwrap();
        assert_eq!(archive_file_name(&url).as_deref(), Some("2022_04_notes.zip"));
        let dir = Url::parse("https://example.com/files/").unwrap();
        assert_eq!(archive_file_name(&dir), None);
    }

    #[tokio::test]
    async fn test_download_then_extract_is_idempotent() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/files/2022q1.zip"))
            .respond_with(
                ResponseTemplate::new(200).set_body_bytes(zip_bytes(&[("sub.tsv", "a\tb\n1\t2\n")])),
            )
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let downloads = dir.path().join("zip_files");
        let extracted = dir.path().join("unzip_files");
        let link = Url::parse(&format!("{}/files/2022q1.zip", server.uri())).unwrap();

        let fetcher = HttpArchiveFetcher::new(Duration::from_secs(5)).unwrap();
        let new_files = fetcher.download(&[link.clone()], &downloads).await.unwrap();
        assert_eq!(new_files, vec![downloads.join("2022q1.zip")]);

        // Second call finds the archive on disk and does not hit the server
        assert!(fetcher.download(&[link], &downloads).await.unwrap().is_empty());

        let folders = fetcher.extract(&downloads, &extracted).await.unwrap();
        assert_eq!(folders, vec![extracted.join("2022q1")]);
        assert_eq!(
            std::fs::read_to_string(extracted.join("2022q1/sub.tsv")).unwrap(),
            "a\tb\n1\t2\n"
        );
        assert!(fetcher.extract(&downloads, &extracted).await.unwrap().is_empty());
    }

    #[test]
    fn test_corrupt_archive_leaves_no_folder() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("broken.zip");
        std::fs::write(&archive, b"not a zip").unwrap();
        let target = dir.path().join("broken");

        assert!(extract_zip(&archive, &target).is_err());
        assert!(!target.exists());
    }
}
