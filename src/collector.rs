use std::sync::Arc;

use anyhow::Result;
use tracing::{info, warn};

use crate::download::{DownloadSummary, ImageDownloader};
use crate::extractor::Extraction;
use crate::models::CountNotification;
use crate::traits::{ProductSource, StatusNotifier};

/// Products required before a batch download is allowed
pub const DEFAULT_MIN_PRODUCTS: usize = 5;

/// What one collection run did
#[derive(Debug)]
pub enum CollectOutcome {
    Downloaded(DownloadSummary),
    /// Fewer products than the minimum, nothing downloaded
    BelowMinimum { found: usize, required: usize },
}

#[derive(Clone)]
pub struct NewGoodsCollector {
    source: Arc<dyn ProductSource>,
    notifier: Arc<dyn StatusNotifier>,
    downloader: ImageDownloader,
    min_products: usize,
}

impl NewGoodsCollector {
    pub fn new(
        source: Arc<dyn ProductSource>,
        notifier: Arc<dyn StatusNotifier>,
        downloader: ImageDownloader,
        min_products: usize,
    ) -> Self {
        Self {
            source,
            notifier,
            downloader,
            min_products,
        }
    }

    /// Detect products and publish the count
    pub async fn scan(&self) -> Result<Extraction> {
        let extraction = self.source.detect_products().await?;

        let notification = CountNotification::new(extraction.products.len(), self.source.page_url());
        if let Err(e) = self.notifier.notify(&notification).await {
            warn!("Status notification failed: {}", e);
        }

        Ok(extraction)
    }

    /// Detect products and download them when there are enough
    pub async fn collect(&self) -> Result<CollectOutcome> {
        let extraction = self.scan().await?;
        self.download_if_enough(&extraction).await
    }

    pub async fn download_if_enough(&self, extraction: &Extraction) -> Result<CollectOutcome> {
        let found = extraction.products.len();

        if found < self.min_products {
            info!(
                "Only {} products found (need {}), skipping download",
                found, self.min_products
            );
            return Ok(CollectOutcome::BelowMinimum {
                found,
                required: self.min_products,
            });
        }

        info!("{} products found, downloading images", found);
        let summary = self.downloader.download_all(&extraction.products).await?;
        Ok(CollectOutcome::Downloaded(summary))
    }
}
