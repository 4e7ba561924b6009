//! Recursive directory watcher with size guard, filtering and settlement.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use notify::{Event, RecursiveMode, Watcher};
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::config::WatcherConfig;

use super::debouncer::Debouncer;
use super::dispatcher::{CacheInvalidator, ChangeSubscriber, Dispatcher, FnSubscriber, SubscriberId};
use super::error::WatchError;
use super::event::ChangeEvent;
use super::event_loop::EventLoop;
use super::filter::PathFilter;
use super::size_guard::{SizeGuard, SizeVerdict};

/// One OS-level subscription for a resolved root.
struct WatchRoot {
    verdict: SizeVerdict,
    _subscription: notify::RecommendedWatcher,
}

/// The running settle loop shared by all roots.
struct Pipeline {
    events: mpsc::Sender<ChangeEvent>,
    cancel: CancellationToken,
}

#[derive(Default)]
struct WatcherState {
    roots: HashMap<PathBuf, WatchRoot>,
    pipeline: Option<Pipeline>,
}

/// Watches directory trees and keeps a cache consistent with them.
///
/// Each root gets exactly one recursive notify subscription. Raw events are
/// normalized, filtered, debounced, and finally dispatched: the cache entry
/// for the settled path is invalidated before any subscriber sees it.
///
/// Requires a Tokio runtime; the settle loop is spawned on the first
/// successful [`watch_directory`](Self::watch_directory).
pub struct FileWatcher {
    filter: Arc<PathFilter>,
    guard: SizeGuard,
    dispatcher: Arc<Dispatcher>,
    quiet: Duration,
    event_buffer: usize,
    state: Mutex<WatcherState>,
}

impl FileWatcher {
    /// Create a builder for configuring the watcher.
    pub fn builder() -> FileWatcherBuilder {
        FileWatcherBuilder::new()
    }

    /// Start watching `root` recursively.
    ///
    /// Watching an already watched root is a no-op that returns the verdict
    /// computed the first time. The size guard runs once, before the
    /// subscription is opened.
    pub async fn watch_directory(&self, root: impl AsRef<Path>) -> Result<SizeVerdict, WatchError> {
        let resolved = resolve_root(root.as_ref())?;

        if let Some(existing) = self.state.lock().roots.get(&resolved) {
            crate::debug_event!("watcher", "already watching", "{}", resolved.display());
            return Ok(existing.verdict);
        }

        let guard = self.guard.clone();
        let scan_root = resolved.clone();
        let verdict = tokio::task::spawn_blocking(move || guard.check(&scan_root))
            .await
            .map_err(|e| WatchError::RootUnavailable {
                root: resolved.clone(),
                reason: format!("size estimate aborted: {e}"),
            })??;

        if verdict.is_large() {
            tracing::warn!(
                "[watcher] large directory {} (estimated {} files), watching may impact performance",
                resolved.display(),
                verdict.estimate
            );
        }

        let mut state = self.state.lock();

        // A concurrent call may have won while the estimate ran
        if let Some(existing) = state.roots.get(&resolved) {
            return Ok(existing.verdict);
        }

        let events = self.ensure_pipeline(&mut state);
        let subscription = match self.subscribe(&resolved, events) {
            Ok(subscription) => subscription,
            Err(e) => {
                if state.roots.is_empty() {
                    Self::shutdown_pipeline(&self.dispatcher, &mut state);
                }
                return Err(e);
            }
        };

        state.roots.insert(
            resolved.clone(),
            WatchRoot {
                verdict,
                _subscription: subscription,
            },
        );

        crate::log_event!(
            "watcher",
            "watching",
            "{} (estimated {} files)",
            resolved.display(),
            verdict.estimate
        );
        Ok(verdict)
    }

    /// Register a subscriber for settled changes.
    pub fn on_change(&self, subscriber: Arc<dyn ChangeSubscriber>) -> SubscriberId {
        self.dispatcher.on_change(subscriber)
    }

    /// Register an async closure as a subscriber.
    pub fn on_change_fn<F, Fut>(&self, name: &str, f: F) -> SubscriberId
    where
        F: Fn(PathBuf) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.dispatcher.on_change(Arc::new(FnSubscriber::new(name, f)))
    }

    /// Unregister a subscriber. Returns `false` if it was not registered.
    pub fn off_change(&self, id: SubscriberId) -> bool {
        self.dispatcher.off_change(id)
    }

    /// Close every subscription and cancel every pending timer.
    ///
    /// No subscriber is started after this returns, including the rest of a
    /// fan-out that is in progress. A subscriber that is already running
    /// finishes its current call.
    pub fn stop(&self) {
        let mut state = self.state.lock();
        Self::shutdown_pipeline(&self.dispatcher, &mut state);
        let roots = std::mem::take(&mut state.roots);
        drop(state);

        let closed = roots.len();
        drop(roots);

        if closed > 0 {
            crate::log_event!("watcher", "stopped", "{closed} roots closed");
        }
    }

    pub fn is_watching(&self, root: impl AsRef<Path>) -> bool {
        match resolve_root(root.as_ref()) {
            Ok(resolved) => self.state.lock().roots.contains_key(&resolved),
            Err(_) => false,
        }
    }

    pub fn watched_roots(&self) -> Vec<PathBuf> {
        let mut roots: Vec<_> = self.state.lock().roots.keys().cloned().collect();
        roots.sort();
        roots
    }

    pub fn subscriber_count(&self) -> usize {
        self.dispatcher.subscriber_count()
    }

    fn ensure_pipeline(&self, state: &mut WatcherState) -> mpsc::Sender<ChangeEvent> {
        if let Some(pipeline) = &state.pipeline {
            return pipeline.events.clone();
        }

        let (tx, rx) = mpsc::channel(self.event_buffer);
        let cancel = CancellationToken::new();
        let event_loop = EventLoop::new(
            rx,
            Debouncer::with_quiet_period(self.quiet),
            Arc::clone(&self.dispatcher),
            cancel.clone(),
        );
        tokio::spawn(event_loop.run());

        state.pipeline = Some(Pipeline {
            events: tx.clone(),
            cancel,
        });
        tx
    }

    fn shutdown_pipeline(dispatcher: &Dispatcher, state: &mut WatcherState) {
        if let Some(pipeline) = state.pipeline.take() {
            dispatcher.halt(&pipeline.cancel);
        }
    }

    fn subscribe(
        &self,
        root: &Path,
        events: mpsc::Sender<ChangeEvent>,
    ) -> Result<notify::RecommendedWatcher, WatchError> {
        let filter = Arc::clone(&self.filter);
        let event_root = root.to_path_buf();

        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| match res {
            Ok(event) => {
                for change in ChangeEvent::from_notify(&event_root, event) {
                    if filter.should_exclude(&change.path, &event_root) {
                        tracing::trace!("[watcher] excluded {}", change.path.display());
                        continue;
                    }
                    // Closed channel means the watcher was stopped
                    if events.blocking_send(change).is_err() {
                        return;
                    }
                }
            }
            Err(e) => {
                tracing::error!("[watcher] file watch error: {e}");
            }
        })
        .map_err(|e| WatchError::backend(root, e))?;

        watcher
            .watch(root, RecursiveMode::Recursive)
            .map_err(|e| WatchError::backend(root, e))?;

        Ok(watcher)
    }
}

impl Drop for FileWatcher {
    fn drop(&mut self) {
        Self::shutdown_pipeline(&self.dispatcher, self.state.get_mut());
    }
}

impl std::fmt::Debug for FileWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileWatcher")
            .field("roots", &self.watched_roots())
            .field("quiet", &self.quiet)
            .field("dispatcher", &self.dispatcher)
            .finish()
    }
}

fn resolve_root(root: &Path) -> Result<PathBuf, WatchError> {
    let resolved = std::fs::canonicalize(root).map_err(|e| WatchError::RootUnavailable {
        root: root.to_path_buf(),
        reason: e.to_string(),
    })?;

    if !resolved.is_dir() {
        return Err(WatchError::RootUnavailable {
            root: resolved,
            reason: "not a directory".to_string(),
        });
    }
    Ok(resolved)
}

/// Builder for constructing a [`FileWatcher`].
pub struct FileWatcherBuilder {
    cache: Option<Arc<dyn CacheInvalidator>>,
    exclude: Vec<String>,
    debounce_ms: u64,
    estimate_cap: usize,
    warn_threshold: usize,
    hard_threshold: usize,
    event_buffer: usize,
}

impl FileWatcherBuilder {
    /// Create a new builder with defaults.
    pub fn new() -> Self {
        Self::from_config(&WatcherConfig::default())
    }

    /// Start from loaded settings.
    pub fn from_config(config: &WatcherConfig) -> Self {
        Self {
            cache: None,
            exclude: config.exclude.clone(),
            debounce_ms: config.debounce_ms,
            estimate_cap: config.estimate_cap,
            warn_threshold: config.warn_threshold,
            hard_threshold: config.hard_threshold,
            event_buffer: config.event_buffer,
        }
    }

    /// Cache invalidated on every settlement.
    pub fn cache(mut self, cache: Arc<dyn CacheInvalidator>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Set the quiet period in milliseconds.
    pub fn debounce_ms(mut self, ms: u64) -> Self {
        self.debounce_ms = ms;
        self
    }

    /// Replace the excluded segment names.
    pub fn exclude<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn size_limits(mut self, estimate_cap: usize, warn: usize, hard: usize) -> Self {
        self.estimate_cap = estimate_cap;
        self.warn_threshold = warn;
        self.hard_threshold = hard;
        self
    }

    pub fn build(self) -> FileWatcher {
        let filter = PathFilter::new(self.exclude);
        let guard = SizeGuard::new(filter.clone()).with_limits(
            self.estimate_cap,
            self.warn_threshold,
            self.hard_threshold,
        );

        FileWatcher {
            filter: Arc::new(filter),
            guard,
            dispatcher: Arc::new(Dispatcher::new(self.cache)),
            quiet: Duration::from_millis(self.debounce_ms),
            event_buffer: self.event_buffer.max(1),
            state: Mutex::new(WatcherState::default()),
        }
    }
}

impl Default for FileWatcherBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_watch_is_idempotent() {
        let temp = TempDir::new().unwrap();
        let watcher = FileWatcher::builder().build();

        let first = watcher.watch_directory(temp.path()).await.unwrap();
        let second = watcher.watch_directory(temp.path()).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(watcher.watched_roots().len(), 1);
        watcher.stop();
    }

    #[tokio::test]
    async fn test_equivalent_spellings_resolve_to_one_root() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir(temp.path().join("sub")).unwrap();
        let watcher = FileWatcher::builder().build();

        watcher.watch_directory(temp.path()).await.unwrap();
        watcher
            .watch_directory(temp.path().join("sub").join(".."))
            .await
            .unwrap();

        assert_eq!(watcher.watched_roots().len(), 1);
        watcher.stop();
    }

    #[tokio::test]
    async fn test_oversized_root_rejected_without_subscription() {
        let temp = TempDir::new().unwrap();
        for i in 0..30 {
            std::fs::write(temp.path().join(format!("{i}.txt")), "").unwrap();
        }

        let watcher = FileWatcher::builder().size_limits(10, 5, 20).build();
        let err = watcher.watch_directory(temp.path()).await.unwrap_err();

        assert!(matches!(err, WatchError::ResourceBoundExceeded { .. }));
        assert!(watcher.watched_roots().is_empty());
    }

    #[tokio::test]
    async fn test_missing_root_is_unavailable() {
        let temp = TempDir::new().unwrap();
        let watcher = FileWatcher::builder().build();

        let err = watcher
            .watch_directory(temp.path().join("missing"))
            .await
            .unwrap_err();
        assert!(matches!(err, WatchError::RootUnavailable { .. }));
    }

    #[tokio::test]
    async fn test_file_root_is_unavailable() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("plain.txt");
        std::fs::write(&file, "x").unwrap();

        let watcher = FileWatcher::builder().build();
        let err = watcher.watch_directory(&file).await.unwrap_err();
        assert!(matches!(err, WatchError::RootUnavailable { .. }));
    }

    #[tokio::test]
    async fn test_stop_clears_roots() {
        let temp = TempDir::new().unwrap();
        let watcher = FileWatcher::builder().build();

        watcher.watch_directory(temp.path()).await.unwrap();
        assert!(watcher.is_watching(temp.path()));

        watcher.stop();
        assert!(!watcher.is_watching(temp.path()));
        assert!(watcher.watched_roots().is_empty());
    }

    #[tokio::test]
    async fn test_subscriber_registration() {
        let watcher = FileWatcher::builder().build();
        let id = watcher.on_change_fn("noop", |_path: PathBuf| async {
            Ok::<(), anyhow::Error>(())
        });

        assert_eq!(watcher.subscriber_count(), 1);
        assert!(watcher.off_change(id));
        assert_eq!(watcher.subscriber_count(), 0);
    }
}
