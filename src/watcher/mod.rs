//! Filesystem watching with debounced settlement.
//!
//! # Architecture
//!
//! ```text
//! FileWatcher::watch_directory(root)
//!   - SizeGuard (refuse oversized trees)
//!   - one notify subscription per root
//!   - PathFilter (drop excluded segments)
//!         |
//!     ChangeEvent
//!         |
//! EventLoop (single task)
//!   - Debouncer (one deadline per path)
//!         |
//!     settled path
//!         |
//! Dispatcher
//!   1. cache.invalidate(path)
//!   2. subscribers, in registration order
//! ```

mod debouncer;
mod dispatcher;
mod error;
mod event;
mod event_loop;
mod file_watcher;
mod filter;
mod size_guard;

pub use debouncer::Debouncer;
pub use dispatcher::{
    CacheInvalidator, ChangeSubscriber, DispatchOutcome, Dispatcher, FnSubscriber, SubscriberId,
};
pub use error::WatchError;
pub use event::{ChangeEvent, ChangeKind};
pub use file_watcher::{FileWatcher, FileWatcherBuilder};
pub use filter::{DEFAULT_EXCLUDES, PathFilter};
pub use size_guard::{
    ESTIMATE_CAP, HARD_THRESHOLD, SizeGuard, SizeLevel, SizeVerdict, WARN_THRESHOLD,
    estimate_directory_size,
};
