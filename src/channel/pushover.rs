//! Pushover delivery.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

use super::{NotificationChannel, require_str};
use crate::error::Result;

const PUSHOVER_API_URL: &str = "https://api.pushover.net/1/messages.json";

pub struct PushoverChannel {
    api_token: String,
    user_key: String,
    client: Client,
}

impl PushoverChannel {
    pub fn from_config(config: &Value) -> Result<Self> {
        Ok(Self {
            api_token: require_str(config, "api_token", "pushover")?,
            user_key: require_str(config, "user_key", "pushover")?,
            client: Client::new(),
        })
    }
}

#[async_trait]
impl NotificationChannel for PushoverChannel {
    async fn send(&self, message: &str, title: &str) -> bool {
        let result = self
            .client
            .post(PUSHOVER_API_URL)
            .form(&[
                ("token", self.api_token.as_str()),
                ("user", self.user_key.as_str()),
                ("message", message),
                ("title", title),
            ])
            .send()
            .await
            .and_then(|response| response.error_for_status());

        match result {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!("Pushover delivery failed: {e}");
                false
            }
        }
    }
}
