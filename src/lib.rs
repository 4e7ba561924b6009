//! Filesystem change detection with a fingerprinted artifact cache.
//!
//! [`FileWatcher`] turns raw OS notifications into one settled notification
//! per path after a quiet period, invalidating an [`ArtifactCache`] before
//! any subscriber runs. The cache can also be asked directly whether a file
//! changed since its artifact was stored.

pub mod cache;
pub mod cli;
pub mod config;
pub mod logging;
pub mod project;
pub mod watcher;

pub use cache::{ArtifactCache, ContentHashMode, FingerprintPolicy};
pub use config::Settings;
pub use project::detect_project_root;
pub use watcher::{
    ChangeSubscriber, DispatchOutcome, FileWatcher, FileWatcherBuilder, SizeGuard, SizeVerdict,
    SubscriberId, WatchError,
};
