use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncwatchError {
    #[error("folder '{0}' is already being monitored")]
    DuplicateName(String),

    #[error("no monitored folder named '{0}'")]
    UnknownWatch(String),

    #[error("path '{0}' does not exist")]
    PathNotFound(PathBuf),

    #[error("invalid notification configuration: {0}")]
    Config(String),

    #[error("registry error: {0}")]
    Persistence(String),

    #[error("watcher error: {0}")]
    Watcher(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, SyncwatchError>;
