//! # Status Notifications
//!
//! After every extraction the detected product count is pushed to a status
//! receiver, the way a browser extension updates its toolbar badge. The
//! signal is fire-and-forget: receivers never acknowledge it and a failed
//! delivery never aborts the run that produced it.
//!
//! ## Badge Semantics
//!
//! - **Text**: the count, or empty when nothing was found
//! - **Colour**: green (`#00a040`) once the count reaches the download
//!   threshold, grey (`#999999`) below it
//! - **Tooltip**: says whether the products are ready to download
//!
//! ## Receivers
//!
//! - [`LogNotifier`] writes the badge state to the log
//! - [`WebhookNotifier`] posts it as a Discord embed when
//!   `DISCORD_WEBHOOK_URL` is configured

use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;
use tracing::{error, info, warn};

use crate::models::{CountNotification, DiscordEmbed, DiscordField, DiscordMessage};
use crate::traits::StatusNotifier;

const READY_COLOR: u32 = 0x00_A0_40;
const IDLE_COLOR: u32 = 0x99_99_99;

/// Toolbar-badge style summary of a product count
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BadgeState {
    pub text: String,
    pub color: u32,
    pub tooltip: String,
}

impl BadgeState {
    /// Derive the badge for `count` products given the download threshold
    pub fn for_count(count: usize, threshold: usize) -> Self {
        let text = if count > 0 {
            count.to_string()
        } else {
            String::new()
        };
        let color = if count >= threshold && count > 0 {
            READY_COLOR
        } else {
            IDLE_COLOR
        };
        let tooltip = if count >= threshold && count > 0 {
            format!("{count} new products found (ready to download)")
        } else if count > 0 {
            format!("{count} new products found (fewer than {threshold})")
        } else {
            "New products image downloader".to_string()
        };

        Self {
            text,
            color,
            tooltip,
        }
    }

    /// `#rrggbb` form of the colour
    pub fn color_hex(&self) -> String {
        format!("#{:06x}", self.color)
    }
}

/// Logs every count signal
pub struct LogNotifier {
    threshold: usize,
}

impl LogNotifier {
    pub fn new(threshold: usize) -> Self {
        Self { threshold }
    }
}

#[async_trait]
impl StatusNotifier for LogNotifier {
    async fn notify(&self, notification: &CountNotification) -> Result<()> {
        let badge = BadgeState::for_count(notification.count, self.threshold);
        info!(
            "Badge [{}] {} {}",
            badge.text,
            badge.color_hex(),
            badge.tooltip
        );
        Ok(())
    }
}

/// Discord webhook receiver for count signals.
///
/// Loads `DISCORD_WEBHOOK_URL` from the environment. When it is missing the
/// notifier stays usable and every signal is skipped.
#[derive(Clone)]
pub struct WebhookNotifier {
    /// Reusable HTTP client for webhook requests
    client: Client,

    /// Webhook URL, `None` disables delivery
    webhook_url: Option<String>,

    threshold: usize,
}

impl WebhookNotifier {
    pub fn from_env(threshold: usize) -> Self {
        Self::new(std::env::var("DISCORD_WEBHOOK_URL").ok(), threshold)
    }

    pub fn new(webhook_url: Option<String>, threshold: usize) -> Self {
        if webhook_url.is_none() {
            warn!("DISCORD_WEBHOOK_URL not set - webhook notifications will be disabled");
        }

        Self {
            client: Client::new(),
            webhook_url,
            threshold,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.webhook_url.is_some()
    }

    /// Build the webhook payload for a count signal
    pub fn message(&self, notification: &CountNotification) -> DiscordMessage {
        let badge = BadgeState::for_count(notification.count, self.threshold);

        let embed = DiscordEmbed {
            title: badge.tooltip,
            description: format!("{} products detected", notification.count),
            url: notification.page_url.clone(),
            color: badge.color,
            timestamp: notification.extracted_at.to_rfc3339(),
            fields: vec![
                DiscordField {
                    name: "Count".to_string(),
                    value: notification.count.to_string(),
                    inline: true,
                },
                DiscordField {
                    name: "Page".to_string(),
                    value: format!("[Open page]({})", notification.page_url),
                    inline: true,
                },
            ],
        };

        DiscordMessage {
            embeds: vec![embed],
        }
    }
}

#[async_trait]
impl StatusNotifier for WebhookNotifier {
    async fn notify(&self, notification: &CountNotification) -> Result<()> {
        let Some(webhook_url) = &self.webhook_url else {
            return Ok(());
        };

        let message = self.message(notification);
        let response = self.client.post(webhook_url).json(&message).send().await?;

        if response.status().is_success() {
            info!("Webhook notified of {} products", notification.count);
        } else {
            error!("Failed to send webhook notification: {}", response.status());
        }

        Ok(())
    }
}

/// Forwards each signal to several receivers, logging failures
pub struct FanoutNotifier {
    receivers: Vec<Box<dyn StatusNotifier>>,
}

impl FanoutNotifier {
    pub fn new(receivers: Vec<Box<dyn StatusNotifier>>) -> Self {
        Self { receivers }
    }
}

#[async_trait]
impl StatusNotifier for FanoutNotifier {
    async fn notify(&self, notification: &CountNotification) -> Result<()> {
        for receiver in &self.receivers {
            if let Err(e) = receiver.notify(notification).await {
                warn!("Status notification failed: {}", e);
            }
        }
        Ok(())
    }
}
