//! Notification delivery channels.
//!
//! Each provider implements the single [`NotificationChannel`] capability and
//! owns its transport parameters, configured entirely at construction time
//! from a tagged [`ChannelConfig`]. The [`create`] factory is the only
//! validation point for channel configuration: it fails closed on an unknown
//! kind or a missing required field, and runs synchronously while a folder is
//! being added.
//!
//! `send` is best-effort: a delivery failure returns `false` and is logged,
//! never retried, and never escalated past the dispatcher.

pub mod discord;
pub mod gotify;
pub mod matrix;
pub mod ntfy;
pub mod pushover;
pub mod telegram;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Result, SyncwatchError};

/// Title used for every quiet-signal notification.
pub const DEFAULT_TITLE: &str = "Sync Complete";

/// A delivery provider. One implementation per service.
#[async_trait]
pub trait NotificationChannel: Send + Sync {
    /// Deliver `message` with `title`. Returns `false` on any failure.
    async fn send(&self, message: &str, title: &str) -> bool;
}

/// Tagged channel configuration, as persisted in the registry:
/// `{ "type": "ntfy", "config": { ... } }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelConfig {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub config: Value,
}

impl ChannelConfig {
    /// One-line, credential-free description for status output.
    pub fn summary(&self) -> String {
        match self.kind.as_str() {
            "ntfy" => match self.config.get("topic").and_then(Value::as_str) {
                Some(topic) => format!("ntfy ({topic})"),
                None => "ntfy".to_string(),
            },
            "telegram" => match self.config.get("chat_id").and_then(Value::as_str) {
                Some(chat) => format!("telegram (chat {chat})"),
                None => "telegram".to_string(),
            },
            "gotify" => match self.config.get("server").and_then(Value::as_str) {
                Some(server) => format!("gotify ({server})"),
                None => "gotify".to_string(),
            },
            "matrix" => match self.config.get("room_id").and_then(Value::as_str) {
                Some(room) => format!("matrix ({room})"),
                None => "matrix".to_string(),
            },
            other => other.to_string(),
        }
    }
}

/// Construct a channel from its tagged configuration.
///
/// This is the only place channel configuration is validated. Unknown kinds
/// and missing required fields fail with [`SyncwatchError::Config`].
pub fn create(config: &ChannelConfig) -> Result<Box<dyn NotificationChannel>> {
    match config.kind.as_str() {
        "ntfy" => Ok(Box::new(ntfy::NtfyChannel::from_config(&config.config)?)),
        "pushover" => Ok(Box::new(pushover::PushoverChannel::from_config(
            &config.config,
        )?)),
        "discord" => Ok(Box::new(discord::DiscordChannel::from_config(
            &config.config,
        )?)),
        "telegram" => Ok(Box::new(telegram::TelegramChannel::from_config(
            &config.config,
        )?)),
        "gotify" => Ok(Box::new(gotify::GotifyChannel::from_config(
            &config.config,
        )?)),
        "matrix" => Ok(Box::new(matrix::MatrixChannel::from_config(
            &config.config,
        )?)),
        other => Err(SyncwatchError::Config(format!(
            "unknown channel type '{other}'"
        ))),
    }
}

/// Pull a required string field out of a provider config.
pub(crate) fn require_str(config: &Value, field: &str, kind: &str) -> Result<String> {
    config
        .get(field)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| {
            SyncwatchError::Config(format!("{kind} channel requires a '{field}' field"))
        })
}

/// Pull an optional string field out of a provider config.
pub(crate) fn optional_str(config: &Value, field: &str) -> Option<String> {
    config
        .get(field)
        .and_then(Value::as_str)
        .map(str::to_string)
}


#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn config(kind: &str, config: Value) -> ChannelConfig {
        ChannelConfig {
            kind: kind.to_string(),
            config,
        }
    }

    #[test]
    fn test_unknown_kind_rejected() {
        // The ok-type is a trait object without Debug, so take the error out
        // by hand rather than via unwrap_err.
        let err = create(&config("carrier-pigeon", json!({})))
            .err()
            .expect("unknown kind must be rejected");
        assert!(matches!(err, SyncwatchError::Config(_)));
        assert!(err.to_string().contains("carrier-pigeon"));
    }

    #[test]
    fn test_missing_required_field_rejected() {
        for (kind, cfg) in [
            ("ntfy", json!({})),
            ("pushover", json!({ "api_token": "t" })),
            ("discord", json!({})),
            ("telegram", json!({ "bot_token": "t" })),
            ("gotify", json!({ "server": "https://gotify.example" })),
            ("matrix", json!({ "homeserver": "https://m.example" })),
        ] {
            let err = create(&config(kind, cfg))
                .err()
                .unwrap_or_else(|| panic!("{kind} should fail closed"));
            assert!(
                matches!(err, SyncwatchError::Config(_)),
                "{kind} should fail with a config error"
            );
        }
    }

    #[test]
    fn test_minimal_configs_accepted() {
        for (kind, cfg) in [
            ("ntfy", json!({ "topic": "alerts" })),
            ("pushover", json!({ "api_token": "t", "user_key": "u" })),
            ("discord", json!({ "webhook_url": "https://example.com/hook" })),
            ("telegram", json!({ "bot_token": "t", "chat_id": "42" })),
            (
                "gotify",
                json!({ "server": "https://gotify.example", "token": "t" }),
            ),
            (
                "matrix",
                json!({
                    "homeserver": "https://m.example",
                    "access_token": "t",
                    "room_id": "!room:example"
                }),
            ),
        ] {
            assert!(create(&config(kind, cfg)).is_ok(), "{kind} should build");
        }
    }

    #[test]
    fn test_summary_omits_credentials() {
        let cfg = config(
            "pushover",
            json!({ "api_token": "secret-token", "user_key": "secret-user" }),
        );
        let summary = cfg.summary();
        assert_eq!(summary, "pushover");
        assert!(!summary.contains("secret"));
    }

    #[test]
    fn test_summary_names_ntfy_topic() {
        let cfg = config("ntfy", json!({ "topic": "sync-alerts" }));
        assert_eq!(cfg.summary(), "ntfy (sync-alerts)");
    }
}
