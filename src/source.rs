//! Raw filesystem event source for one watched root.
//!
//! Wraps a recursive `notify::RecommendedWatcher` and bridges its events
//! through a tokio channel into [`FolderWatch::handle_event`]. The source is
//! a pure producer: event qualification and debouncing live entirely in the
//! watch's state machine.

use std::path::Path;
use std::sync::Arc;

use notify::{RecursiveMode, Watcher};
use tokio::task::JoinHandle;

use crate::error::{Result, SyncwatchError};
use crate::watch::{ChangeEvent, FolderWatch};

/// Live event producer for one folder watch.
///
/// Must be kept alive — dropping it deregisters the OS file-watch and stops
/// event delivery for the root.
pub struct EventSource {
    /// Never read directly, but dropping the `RecommendedWatcher` stops all
    /// event delivery, so it lives here for the source's lifetime.
    _watcher: notify::RecommendedWatcher,
    forwarder: JoinHandle<()>,
}

impl EventSource {
    /// Start watching `root` recursively, feeding events into `watch`.
    pub fn start(root: &Path, watch: Arc<FolderWatch>) -> Result<Self> {
        let (bridge_tx, mut bridge_rx) = tokio::sync::mpsc::unbounded_channel::<notify::Event>();

        // The notify callback runs on notify's own thread; it only bridges
        // into tokio.
        let mut watcher = notify::RecommendedWatcher::new(
            move |res: std::result::Result<notify::Event, notify::Error>| match res {
                Ok(event) => {
                    let _ = bridge_tx.send(event);
                }
                Err(e) => {
                    tracing::warn!("filesystem watcher error: {e}");
                }
            },
            notify::Config::default(),
        )
        .map_err(|e| {
            SyncwatchError::Watcher(format!("failed to create filesystem watcher: {e}"))
        })?;

        watcher.watch(root, RecursiveMode::Recursive).map_err(|e| {
            SyncwatchError::Watcher(format!("failed to watch {}: {e}", root.display()))
        })?;

        let forwarder = tokio::spawn(async move {
            while let Some(event) = bridge_rx.recv().await {
                for change in changes_from(&event) {
                    watch.handle_event(&change);
                }
            }
        });

        Ok(Self {
            _watcher: watcher,
            forwarder,
        })
    }
}

impl Drop for EventSource {
    fn drop(&mut self) {
        self.forwarder.abort();
    }
}

/// Flatten a notify event into per-path change events.
fn changes_from(event: &notify::Event) -> Vec<ChangeEvent> {
    use notify::EventKind;
    use notify::event::{CreateKind, RemoveKind};

    // Reads are not activity.
    if matches!(event.kind, EventKind::Access(_)) {
        return Vec::new();
    }

    // For removals the path is already gone, so `is_dir()` alone would
    // misclassify removed directories.
    let kind_is_dir = matches!(
        event.kind,
        EventKind::Create(CreateKind::Folder) | EventKind::Remove(RemoveKind::Folder)
    );

    event
        .paths
        .iter()
        .map(|path| ChangeEvent {
            path: path.clone(),
            is_directory: kind_is_dir || path.is_dir(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use notify::EventKind;
    use notify::event::{AccessKind, CreateKind, RemoveKind};

    use super::*;

    #[test]
    fn test_access_events_produce_nothing() {
        let event =
            notify::Event::new(EventKind::Access(AccessKind::Read)).add_path(PathBuf::from("/a"));
        assert!(changes_from(&event).is_empty());
    }

    #[test]
    fn test_folder_kinds_marked_as_directories() {
        let event = notify::Event::new(EventKind::Remove(RemoveKind::Folder))
            .add_path(PathBuf::from("/watched/gone-dir"));
        let changes = changes_from(&event);
        assert_eq!(changes.len(), 1);
        assert!(changes[0].is_directory);
    }

    #[test]
    fn test_file_creation_is_a_file_change() {
        let event = notify::Event::new(EventKind::Create(CreateKind::File))
            .add_path(PathBuf::from("/watched/new.txt"));
        let changes = changes_from(&event);
        assert_eq!(changes.len(), 1);
        assert!(!changes[0].is_directory);
        assert!(changes[0].qualifies());
    }
}
