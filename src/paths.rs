//! Filesystem locations for the registry and log file.
//!
//! Everything lives under the platform config directory (e.g.
//! `~/.config/syncwatch` on Linux). `SYNCWATCH_CONFIG_DIR` overrides the
//! location, which tests use to point at a temp directory.

use std::env;
use std::path::PathBuf;

use directories::ProjectDirs;

/// Resolve the syncwatch config directory.
pub fn config_dir() -> PathBuf {
    if let Ok(dir) = env::var("SYNCWATCH_CONFIG_DIR")
        && !dir.is_empty()
    {
        return PathBuf::from(dir);
    }

    ProjectDirs::from("", "", "syncwatch")
        .map(|dirs| dirs.config_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from(".syncwatch"))
}

/// Path to the persisted watch registry.
pub fn registry_path() -> PathBuf {
    config_dir().join("config.json")
}

/// Path to the daemon log file.
pub fn log_path() -> PathBuf {
    config_dir().join("monitor.log")
}
