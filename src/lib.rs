pub mod channel;
pub mod dispatch;
pub mod error;
pub mod paths;
pub mod registry;
pub mod source;
pub mod supervisor;
pub mod watch;

pub use channel::{ChannelConfig, NotificationChannel};
pub use error::{Result, SyncwatchError};
pub use registry::{DEFAULT_INACTIVITY_SECS, DEFAULT_MESSAGE_TEMPLATE, Registry, WatchEntry};
pub use supervisor::{Supervisor, WatchStatus};
pub use watch::{ChangeEvent, FolderWatch, WatchState};
