//! Owns the registry and the collection of live folder watches.
//!
//! All mutation (add, remove, start, shutdown) and the status snapshot are
//! funneled through one `tokio::sync::Mutex`, so concurrent operations on
//! different names cannot corrupt the registry and a snapshot never observes
//! a half-applied change. No network send happens under this lock — delivery
//! runs on the watch's own checker task.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use crate::channel::{self, ChannelConfig};
use crate::dispatch::DeliveryTarget;
use crate::error::{Result, SyncwatchError};
use crate::registry::{DEFAULT_MESSAGE_TEMPLATE, Registry, WatchEntry};
use crate::source::EventSource;
use crate::watch::{DEFAULT_POLL_TICK, FolderWatch, WatchState};

/// Read-only snapshot of one live watch.
#[derive(Debug, Clone, Serialize)]
pub struct WatchStatus {
    pub path: PathBuf,
    pub channel: String,
    pub inactivity_period: u64,
    pub last_activity: Option<String>,
    pub state: WatchState,
}

struct ActiveWatch {
    watch: Arc<FolderWatch>,
    // Dropping the source stops event delivery for the root.
    _source: EventSource,
}

struct Inner {
    registry: Registry,
    watches: BTreeMap<String, ActiveWatch>,
}

/// Lifecycle owner for every monitored folder.
pub struct Supervisor {
    registry_path: PathBuf,
    poll_tick: Duration,
    inner: tokio::sync::Mutex<Inner>,
}

impl Supervisor {
    /// Load the registry from `registry_path` and construct an idle
    /// supervisor (no watches running until [`start_all`](Self::start_all)
    /// or [`add_folder`](Self::add_folder)).
    pub fn new(registry_path: PathBuf) -> Result<Self> {
        Self::with_poll_tick(registry_path, DEFAULT_POLL_TICK)
    }

    /// Like [`new`](Self::new) with an explicit checker poll tick.
    pub fn with_poll_tick(registry_path: PathBuf, poll_tick: Duration) -> Result<Self> {
        let registry = Registry::load(&registry_path)?;
        Ok(Self {
            registry_path,
            poll_tick,
            inner: tokio::sync::Mutex::new(Inner {
                registry,
                watches: BTreeMap::new(),
            }),
        })
    }

    /// Register and start monitoring a new folder.
    ///
    /// Fails without mutating anything if the name is taken, the path does
    /// not exist, or the channel configuration is invalid. On success the
    /// watch is live and the registry has been rewritten.
    pub async fn add_folder(
        &self,
        name: &str,
        path: &Path,
        notification: ChannelConfig,
        inactivity_period: Duration,
        message: Option<String>,
    ) -> Result<()> {
        let mut inner = self.inner.lock().await;

        if inner.registry.folders.contains_key(name) || inner.watches.contains_key(name) {
            return Err(SyncwatchError::DuplicateName(name.to_string()));
        }
        if !path.exists() {
            return Err(SyncwatchError::PathNotFound(path.to_path_buf()));
        }

        // The only validation point for channel configuration.
        let channel = channel::create(&notification)?;

        let template = message.unwrap_or_else(|| DEFAULT_MESSAGE_TEMPLATE.to_string());
        let watch = FolderWatch::new(
            name,
            inactivity_period,
            self.poll_tick,
            DeliveryTarget {
                folder: name.to_string(),
                template: template.clone(),
                channel,
            },
        );
        let source = EventSource::start(path, Arc::clone(&watch))?;

        let entry = WatchEntry {
            path: path.to_path_buf(),
            notification,
            inactivity_period: inactivity_period.as_secs(),
            message_template: template,
        };
        inner.registry.folders.insert(name.to_string(), entry);

        if let Err(e) = inner.registry.save(&self.registry_path) {
            // Roll back: the failed add must leave no registry entry and no
            // live watch behind.
            inner.registry.folders.remove(name);
            drop(source);
            watch.stop().await;
            return Err(e);
        }

        inner.watches.insert(
            name.to_string(),
            ActiveWatch {
                watch,
                _source: source,
            },
        );

        tracing::info!("started monitoring '{name}' at '{}'", path.display());
        Ok(())
    }

    /// Stop monitoring `name` and drop it from the registry.
    ///
    /// Once this returns, no further quiet signal for the watch will fire.
    pub async fn remove_folder(&self, name: &str) -> Result<()> {
        let mut inner = self.inner.lock().await;

        if !inner.registry.folders.contains_key(name) && !inner.watches.contains_key(name) {
            return Err(SyncwatchError::UnknownWatch(name.to_string()));
        }

        if let Some(active) = inner.watches.remove(name) {
            active.watch.stop().await;
        }
        inner.registry.folders.remove(name);
        inner.registry.save(&self.registry_path)?;

        tracing::info!("stopped monitoring '{name}'");
        Ok(())
    }

    /// Consistent snapshot of every live watch.
    pub async fn status(&self) -> BTreeMap<String, WatchStatus> {
        let inner = self.inner.lock().await;

        inner
            .watches
            .iter()
            .map(|(name, active)| {
                let entry = &inner.registry.folders[name];
                (
                    name.clone(),
                    WatchStatus {
                        path: entry.path.clone(),
                        channel: entry.notification.summary(),
                        inactivity_period: entry.inactivity_period,
                        last_activity: active.watch.last_activity().map(|t| t.to_string()),
                        state: active.watch.state(),
                    },
                )
            })
            .collect()
    }

    /// Reconstruct a live watch for every persisted entry, in registry
    /// order. A single entry failing (path gone, invalid channel config) is
    /// logged and skipped; the others still start.
    pub async fn start_all(&self) -> usize {
        let mut inner = self.inner.lock().await;
        let entries: Vec<(String, WatchEntry)> = inner
            .registry
            .folders
            .iter()
            .map(|(name, entry)| (name.clone(), entry.clone()))
            .collect();

        let mut started = 0;
        for (name, entry) in entries {
            if inner.watches.contains_key(&name) {
                continue;
            }
            match self.reconstruct(&name, &entry) {
                Ok(active) => {
                    tracing::info!(
                        "started monitoring '{name}' at '{}'",
                        entry.path.display()
                    );
                    inner.watches.insert(name, active);
                    started += 1;
                }
                Err(e) => {
                    tracing::warn!("skipping '{name}': {e}");
                }
            }
        }
        started
    }

    /// Stop every live watch and wait for each checker task to terminate.
    /// The registry is left untouched so the next `start` sees the same
    /// configuration.
    pub async fn shutdown(&self) {
        let mut inner = self.inner.lock().await;
        let watches = std::mem::take(&mut inner.watches);
        for (name, active) in watches {
            active.watch.stop().await;
            tracing::info!("stopped monitoring '{name}'");
        }
    }

    fn reconstruct(&self, name: &str, entry: &WatchEntry) -> Result<ActiveWatch> {
        if !entry.path.exists() {
            return Err(SyncwatchError::PathNotFound(entry.path.clone()));
        }
        let channel = channel::create(&entry.notification)?;
        let watch = FolderWatch::new(
            name,
            Duration::from_secs(entry.inactivity_period),
            self.poll_tick,
            DeliveryTarget {
                folder: name.to_string(),
                template: entry.message_template.clone(),
                channel,
            },
        );
        let source = EventSource::start(&entry.path, Arc::clone(&watch))?;
        Ok(ActiveWatch {
            watch,
            _source: source,
        })
    }
}
