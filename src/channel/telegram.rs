//! Telegram bot delivery.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Value, json};

use super::{NotificationChannel, require_str};
use crate::error::Result;

pub struct TelegramChannel {
    bot_token: String,
    chat_id: String,
    client: Client,
}

impl TelegramChannel {
    pub fn from_config(config: &Value) -> Result<Self> {
        Ok(Self {
            bot_token: require_str(config, "bot_token", "telegram")?,
            chat_id: require_str(config, "chat_id", "telegram")?,
            client: Client::new(),
        })
    }
}

#[async_trait]
impl NotificationChannel for TelegramChannel {
    async fn send(&self, message: &str, title: &str) -> bool {
        let body = json!({
            "chat_id": self.chat_id,
            "text": format!("*{title}*\n{message}"),
            "parse_mode": "Markdown",
        });

        let result = self
            .client
            .post(format!(
                "https://api.telegram.org/bot{}/sendMessage",
                self.bot_token
            ))
            .json(&body)
            .send()
            .await
            .and_then(|response| response.error_for_status());

        match result {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!("Telegram delivery failed: {e}");
                false
            }
        }
    }
}
