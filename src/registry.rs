//! Durable registry of configured watches.
//!
//! The registry is the on-disk record of every monitored folder, independent
//! of live running state. It is read once when a supervisor is constructed
//! and rewritten in full after every successful add or remove — never on
//! quiet signals or notification sends.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::channel::ChannelConfig;
use crate::error::{Result, SyncwatchError};

/// Default message template when none is given.
pub const DEFAULT_MESSAGE_TEMPLATE: &str = "Sync complete for {folder}";

/// Default inactivity period in seconds.
pub const DEFAULT_INACTIVITY_SECS: u64 = 300;

/// Persisted configuration for one monitored folder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchEntry {
    /// Filesystem root being observed.
    pub path: PathBuf,
    /// Tagged notification channel configuration.
    pub notification: ChannelConfig,
    /// Quiet-signal threshold in seconds.
    pub inactivity_period: u64,
    /// Message template; `{folder}` is replaced with the watch name.
    #[serde(default = "default_template")]
    pub message_template: String,
}

fn default_template() -> String {
    DEFAULT_MESSAGE_TEMPLATE.to_string()
}

/// The full registry: watch name -> persisted configuration.
///
/// A `BTreeMap` keeps registry order deterministic, so startup reconstructs
/// watches in the same order every time.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Registry {
    #[serde(default)]
    pub folders: BTreeMap<String, WatchEntry>,
}

impl Registry {
    /// Load the registry from `path`.
    ///
    /// A missing file yields an empty registry. A file that exists but
    /// cannot be read or parsed is an error — the registry holds channel
    /// credentials, so it is never silently reset.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Registry::default());
        }

        let content = fs::read_to_string(path).map_err(|e| {
            SyncwatchError::Persistence(format!("cannot read {}: {e}", path.display()))
        })?;
        serde_json::from_str(&content).map_err(|e| {
            SyncwatchError::Persistence(format!("cannot parse {}: {e}", path.display()))
        })
    }

    /// Write the registry to `path` in full, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                SyncwatchError::Persistence(format!("cannot create {}: {e}", parent.display()))
            })?;
        }

        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content).map_err(|e| {
            SyncwatchError::Persistence(format!("cannot write {}: {e}", path.display()))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn sample_entry(path: &Path) -> WatchEntry {
        WatchEntry {
            path: path.to_path_buf(),
            notification: ChannelConfig {
                kind: "ntfy".to_string(),
                config: json!({ "topic": "sync-alerts" }),
            },
            inactivity_period: 120,
            message_template: "Done: {folder}".to_string(),
        }
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let tmp = TempDir::new().unwrap();
        let registry = Registry::load(&tmp.path().join("config.json")).unwrap();
        assert!(registry.folders.is_empty());
    }

    #[test]
    fn test_save_load_roundtrip() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("config.json");

        let mut registry = Registry::default();
        registry
            .folders
            .insert("docs".to_string(), sample_entry(tmp.path()));
        registry.save(&file).unwrap();

        let loaded = Registry::load(&file).unwrap();
        assert_eq!(loaded.folders.len(), 1);
        let entry = &loaded.folders["docs"];
        assert_eq!(entry.path, tmp.path());
        assert_eq!(entry.inactivity_period, 120);
        assert_eq!(entry.message_template, "Done: {folder}");
        assert_eq!(entry.notification.kind, "ntfy");
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("config.json");
        fs::write(&file, "{ not json").unwrap();

        let err = Registry::load(&file).unwrap_err();
        assert!(matches!(err, SyncwatchError::Persistence(_)));
    }

    #[test]
    fn test_missing_template_defaults() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("config.json");
        let raw = json!({
            "folders": {
                "music": {
                    "path": tmp.path(),
                    "notification": { "type": "discord", "config": { "webhook_url": "https://example.com/hook" } },
                    "inactivity_period": 60
                }
            }
        });
        fs::write(&file, serde_json::to_string(&raw).unwrap()).unwrap();

        let loaded = Registry::load(&file).unwrap();
        assert_eq!(
            loaded.folders["music"].message_template,
            DEFAULT_MESSAGE_TEMPLATE
        );
    }
}
