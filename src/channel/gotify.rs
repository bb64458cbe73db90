//! Gotify delivery.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Value, json};

use super::{NotificationChannel, require_str};
use crate::error::Result;

pub struct GotifyChannel {
    server: String,
    token: String,
    client: Client,
}

impl GotifyChannel {
    pub fn from_config(config: &Value) -> Result<Self> {
        Ok(Self {
            server: require_str(config, "server", "gotify")?
                .trim_end_matches('/')
                .to_string(),
            token: require_str(config, "token", "gotify")?,
            client: Client::new(),
        })
    }
}

#[async_trait]
impl NotificationChannel for GotifyChannel {
    async fn send(&self, message: &str, title: &str) -> bool {
        let body = json!({
            "message": message,
            "title": title,
            "priority": 5,
        });

        let result = self
            .client
            .post(format!("{}/message", self.server))
            .header("X-Gotify-Key", &self.token)
            .json(&body)
            .send()
            .await
            .and_then(|response| response.error_for_status());

        match result {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!("Gotify delivery failed: {e}");
                false
            }
        }
    }
}
