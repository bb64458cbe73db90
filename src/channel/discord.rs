//! Discord webhook delivery.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Value, json};

use super::{NotificationChannel, require_str};
use crate::error::Result;

/// Embed accent color (blurple).
const EMBED_COLOR: u32 = 5814783;

pub struct DiscordChannel {
    webhook_url: String,
    client: Client,
}

impl DiscordChannel {
    pub fn from_config(config: &Value) -> Result<Self> {
        Ok(Self {
            webhook_url: require_str(config, "webhook_url", "discord")?,
            client: Client::new(),
        })
    }
}

#[async_trait]
impl NotificationChannel for DiscordChannel {
    async fn send(&self, message: &str, title: &str) -> bool {
        let body = json!({
            "content": message,
            "embeds": [{
                "title": title,
                "color": EMBED_COLOR,
            }],
        });

        let result = self
            .client
            .post(&self.webhook_url)
            .json(&body)
            .send()
            .await
            .and_then(|response| response.error_for_status());

        match result {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!("Discord delivery failed: {e}");
                false
            }
        }
    }
}
