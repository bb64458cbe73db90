//! ntfy.sh (or self-hosted ntfy) delivery.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

use super::{NotificationChannel, optional_str, require_str};
use crate::error::Result;

const DEFAULT_SERVER: &str = "https://ntfy.sh";

pub struct NtfyChannel {
    server: String,
    topic: String,
    client: Client,
}

impl NtfyChannel {
    pub fn from_config(config: &Value) -> Result<Self> {
        let server = optional_str(config, "server").unwrap_or_else(|| DEFAULT_SERVER.to_string());
        Ok(Self {
            server: server.trim_end_matches('/').to_string(),
            topic: require_str(config, "topic", "ntfy")?,
            client: Client::new(),
        })
    }
}

#[async_trait]
impl NotificationChannel for NtfyChannel {
    async fn send(&self, message: &str, title: &str) -> bool {
        let result = self
            .client
            .post(format!("{}/{}", self.server, self.topic))
            .header("Title", title)
            .header("Priority", "default")
            .header("Tags", "sync,complete")
            .body(message.to_string())
            .send()
            .await
            .and_then(|response| response.error_for_status());

        match result {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!("ntfy delivery failed: {e}");
                false
            }
        }
    }
}
