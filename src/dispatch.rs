//! Bridges a watch's quiet signal to a notification send.
//!
//! Delivery failures are logged and fully absorbed here: nothing propagates
//! back into the watch's state machine, and no retry is attempted.

use crate::channel::{DEFAULT_TITLE, NotificationChannel};

/// Everything needed to deliver one folder's quiet-signal notification.
///
/// Owned by the [`FolderWatch`](crate::watch::FolderWatch); the checker task
/// holds an `Arc` so the send runs without any registry or per-watch lock.
pub struct DeliveryTarget {
    /// Watch name, substituted for `{folder}` in the template.
    pub folder: String,
    /// Message template with a `{folder}` placeholder.
    pub template: String,
    /// The provider this watch delivers through.
    pub channel: Box<dyn NotificationChannel>,
}

/// Substitute the watch name into the message template.
pub fn format_message(template: &str, folder: &str) -> String {
    template.replace("{folder}", folder)
}

/// Deliver one quiet-signal notification and log the outcome.
pub async fn deliver(target: &DeliveryTarget) {
    let message = format_message(&target.template, &target.folder);
    if target.channel.send(&message, DEFAULT_TITLE).await {
        tracing::info!("[{}] notification sent", target.folder);
    } else {
        tracing::error!("[{}] failed to send notification", target.folder);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use super::*;
    use crate::channel::testing::RecordingChannel;

    #[test]
    fn test_format_message_substitutes_every_placeholder() {
        assert_eq!(
            format_message("{folder}: sync of {folder} done", "docs"),
            "docs: sync of docs done"
        );
        assert_eq!(format_message("no placeholder", "docs"), "no placeholder");
    }

    #[tokio::test]
    async fn test_deliver_sends_formatted_message() {
        let channel = RecordingChannel::new(true);
        let sent = channel.sent.clone();
        let target = DeliveryTarget {
            folder: "docs".to_string(),
            template: "Sync complete for {folder}".to_string(),
            channel: Box::new(channel),
        };

        deliver(&target).await;

        let sent = sent.lock();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "Sync complete for docs");
        assert_eq!(sent[0].1, DEFAULT_TITLE);
    }

    #[tokio::test]
    async fn test_deliver_absorbs_failure() {
        let channel = RecordingChannel::new(false);
        let count = channel.count.clone();
        let target = DeliveryTarget {
            folder: "w".to_string(),
            template: "{folder}".to_string(),
            channel: Box::new(channel),
        };

        // Must not panic or surface an error.
        deliver(&target).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }
}
