//! Data models for extracted product images, status signals and Discord webhook payloads

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A product thumbnail detected on the new products page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductRecord {
    /// Human-readable label, never empty
    pub name: String,
    /// Absolute `http`/`https` URL of the image
    #[serde(rename = "imageUrl")]
    pub image_url: String,
    /// 1-based rank in discovery order, dense within one extraction
    pub position: usize,
}

/// Response to a "get products" request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductsResponse {
    pub products: Vec<ProductRecord>,
}

/// Count signal emitted after every page extraction
#[derive(Debug, Clone, Serialize)]
pub struct CountNotification {
    pub count: usize,
    pub page_url: String,
    pub extracted_at: DateTime<Utc>,
}

impl CountNotification {
    pub fn new(count: usize, page_url: impl Into<String>) -> Self {
        Self {
            count,
            page_url: page_url.into(),
            extracted_at: Utc::now(),
        }
    }
}

/// Discord embed structure for rich notifications
#[derive(Debug, Serialize)]
pub struct DiscordEmbed {
    pub title: String,
    pub description: String,
    pub url: String,
    pub color: u32,
    pub timestamp: String,
    pub fields: Vec<DiscordField>,
}

/// Key-value field for Discord embeds
#[derive(Debug, Serialize)]
pub struct DiscordField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

/// Discord webhook message payload
#[derive(Debug, Serialize)]
pub struct DiscordMessage {
    pub embeds: Vec<DiscordEmbed>,
}
