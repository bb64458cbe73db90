//! Matrix room delivery via the client-server API.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Value, json};

use super::{NotificationChannel, require_str};
use crate::error::Result;

pub struct MatrixChannel {
    homeserver: String,
    access_token: String,
    room_id: String,
    client: Client,
}

impl MatrixChannel {
    pub fn from_config(config: &Value) -> Result<Self> {
        Ok(Self {
            homeserver: require_str(config, "homeserver", "matrix")?
                .trim_end_matches('/')
                .to_string(),
            access_token: require_str(config, "access_token", "matrix")?,
            room_id: require_str(config, "room_id", "matrix")?,
            client: Client::new(),
        })
    }
}

#[async_trait]
impl NotificationChannel for MatrixChannel {
    async fn send(&self, message: &str, title: &str) -> bool {
        let body = json!({
            "msgtype": "m.text",
            "body": format!("{title}\n{message}"),
            "format": "org.matrix.custom.html",
            "formatted_body": format!("<strong>{title}</strong><br>{message}"),
        });

        let result = self
            .client
            .post(format!(
                "{}/_matrix/client/r0/rooms/{}/send/m.room.message",
                self.homeserver, self.room_id
            ))
            .query(&[("access_token", &self.access_token)])
            .json(&body)
            .send()
            .await
            .and_then(|response| response.error_for_status());

        match result {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!("Matrix delivery failed: {e}");
                false
            }
        }
    }
}
