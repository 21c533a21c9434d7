//! Sequential image downloads to a local directory

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::Client;
use reqwest::header::REFERER;
use tracing::{error, info};
use url::Url;

use crate::models::ProductRecord;

const MAX_NAME_CHARS: usize = 100;
const FALLBACK_EXTENSION: &str = "jpg";

/// Replace characters that are not allowed in file names and cap the length
pub fn safe_file_name(name: &str) -> String {
    name.trim()
        .chars()
        .map(|c| match c {
            '\\' | '/' | '*' | '?' | ':' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .take(MAX_NAME_CHARS)
        .collect()
}

/// Lowercase extension of the URL's last path segment, `jpg` when there is none
pub fn image_extension(image_url: &str) -> String {
    let Ok(url) = Url::parse(image_url) else {
        return FALLBACK_EXTENSION.to_string();
    };

    url.path_segments()
        .and_then(|mut segments| segments.next_back())
        .and_then(|segment| segment.rsplit_once('.'))
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .filter(|ext| !ext.is_empty() && ext.len() <= 5 && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .unwrap_or_else(|| FALLBACK_EXTENSION.to_string())
}

/// File name for a record, e.g. `famima_03_たまごサンド.jpg`
pub fn file_name_for(record: &ProductRecord, prefix: &str) -> String {
    format!(
        "{prefix}{:02}_{}.{}",
        record.position,
        safe_file_name(&record.name),
        image_extension(&record.image_url)
    )
}

/// Outcome of a download batch
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DownloadSummary {
    pub succeeded: usize,
    pub failed: usize,
    pub saved: Vec<PathBuf>,
}

/// Downloads product images one at a time with a pause in between
#[derive(Clone)]
pub struct ImageDownloader {
    client: Client,
    output_dir: PathBuf,
    delay: Duration,
    file_prefix: String,
    referer: Option<String>,
}

impl ImageDownloader {
    pub fn new(client: Client, output_dir: impl Into<PathBuf>, delay: Duration) -> Self {
        Self {
            client,
            output_dir: output_dir.into(),
            delay,
            file_prefix: "famima_".to_string(),
            referer: None,
        }
    }

    /// Send `referer` with every image request
    #[must_use]
    pub fn with_referer(mut self, referer: impl Into<String>) -> Self {
        self.referer = Some(referer.into());
        self
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Download every record in order; individual failures are counted, not returned
    pub async fn download_all(&self, records: &[ProductRecord]) -> Result<DownloadSummary> {
        tokio::fs::create_dir_all(&self.output_dir)
            .await
            .with_context(|| format!("Failed to create {}", self.output_dir.display()))?;

        info!(
            "Downloading {} images to {}",
            records.len(),
            self.output_dir.display()
        );

        let mut summary = DownloadSummary::default();

        for (i, record) in records.iter().enumerate() {
            if i > 0 {
                tokio::time::sleep(self.delay).await;
            }

            match self.download_one(record).await {
                Ok(path) => {
                    summary.succeeded += 1;
                    info!(
                        "Downloaded {}/{}: {}",
                        summary.succeeded,
                        records.len(),
                        path.display()
                    );
                    summary.saved.push(path);
                }
                Err(e) => {
                    summary.failed += 1;
                    error!("Download failed ({}): {:#}", record.name, e);
                }
            }
        }

        info!(
            "Downloads finished: {} succeeded, {} failed",
            summary.succeeded, summary.failed
        );
        Ok(summary)
    }

    async fn download_one(&self, record: &ProductRecord) -> Result<PathBuf> {
        let mut request = self.client.get(&record.image_url);
        if let Some(referer) = &self.referer {
            request = request.header(REFERER, referer);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(anyhow::anyhow!(
                "Failed to fetch {}: {}",
                record.image_url,
                response.status()
            ));
        }

        let bytes = response.bytes().await?;
        let path = self.output_dir.join(file_name_for(record, &self.file_prefix));
        tokio::fs::write(&path, &bytes)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;

        Ok(path)
    }
}
