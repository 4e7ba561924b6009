//! Error types for the watcher subsystem.
//!
//! Only [`WatchError::ResourceBoundExceeded`], [`WatchError::NotificationBackendFailure`]
//! and [`WatchError::RootUnavailable`] are ever returned from
//! [`FileWatcher::watch_directory`](super::FileWatcher::watch_directory).
//! Subscriber failures are logged by the dispatcher and never propagated.

use std::path::PathBuf;
use thiserror::Error;

/// Errors from watcher operations.
#[derive(Error, Debug)]
pub enum WatchError {
    #[error(
        "Directory too large to watch: {root} (estimated {estimate} files, limit {threshold}). \
         Narrow the watched scope by passing a smaller directory or setting FRESHWATCH_ROOT."
    )]
    ResourceBoundExceeded {
        root: PathBuf,
        estimate: usize,
        threshold: usize,
    },

    #[error("Cannot subscribe to changes under {root}: {reason}")]
    NotificationBackendFailure { root: PathBuf, reason: String },

    #[error("Cannot watch {root}: {reason}")]
    RootUnavailable { root: PathBuf, reason: String },

    #[error("Subscriber '{subscriber}' failed for {path}: {reason}")]
    SubscriberFailed {
        subscriber: String,
        path: PathBuf,
        reason: String,
    },

    #[error("Invalid configuration: {reason}")]
    ConfigError { reason: String },
}

impl WatchError {
    /// Attach the root to a notify failure.
    pub fn backend(root: impl Into<PathBuf>, err: notify::Error) -> Self {
        WatchError::NotificationBackendFailure {
            root: root.into(),
            reason: err.to_string(),
        }
    }
}
