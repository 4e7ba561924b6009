//! Settlement fan-out.
//!
//! For every settled path the dispatcher first invalidates the cache entry,
//! then invokes each subscriber in registration order, one at a time. A
//! subscriber that errors or panics is logged and skipped; the rest still
//! run.
//!
//! Every step of a dispatch is gated on the pipeline's cancellation token.
//! [`Dispatcher::halt`] cancels under the same gate, so once it returns no
//! invalidation happens and no further subscriber is started. A subscriber
//! already started finishes its call.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use parking_lot::RwLock;
use tokio_util::sync::CancellationToken;

use super::error::WatchError;

/// Something that can drop a cached entry for a path.
///
/// Implemented by [`ArtifactCache`](crate::cache::ArtifactCache).
pub trait CacheInvalidator: Send + Sync {
    fn invalidate(&self, path: &Path);
}

/// A consumer of settled change notifications.
#[async_trait]
pub trait ChangeSubscriber: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &str;

    /// Called once per settled path, after the cache entry is gone.
    async fn on_change(&self, path: &Path) -> anyhow::Result<()>;
}

type BoxedCallback =
    Box<dyn Fn(PathBuf) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send>> + Send + Sync>;

/// Adapts an async closure into a [`ChangeSubscriber`].
pub struct FnSubscriber {
    name: String,
    callback: BoxedCallback,
}

impl FnSubscriber {
    pub fn new<F, Fut>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(PathBuf) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        Self {
            name: name.into(),
            callback: Box::new(move |path| Box::pin(f(path))),
        }
    }
}

#[async_trait]
impl ChangeSubscriber for FnSubscriber {
    fn name(&self) -> &str {
        &self.name
    }

    async fn on_change(&self, path: &Path) -> anyhow::Result<()> {
        (self.callback)(path.to_path_buf()).await
    }
}

/// Handle returned by registration, used to unregister.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriberId(u64);

/// Result of dispatching one settled path.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchOutcome {
    pub delivered: usize,
    pub failed: usize,
    /// Subscribers not started because the dispatch was halted.
    pub skipped: usize,
}

/// Invalidates, then notifies subscribers sequentially.
pub struct Dispatcher {
    cache: Option<Arc<dyn CacheInvalidator>>,
    subscribers: RwLock<Vec<(SubscriberId, Arc<dyn ChangeSubscriber>)>>,
    next_id: AtomicU64,
    /// Held shared while a step starts, exclusively while halting.
    gate: RwLock<()>,
}

impl Dispatcher {
    pub fn new(cache: Option<Arc<dyn CacheInvalidator>>) -> Self {
        Self {
            cache,
            subscribers: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(1),
            gate: RwLock::new(()),
        }
    }

    /// Register a subscriber. Delivery follows registration order.
    pub fn on_change(&self, subscriber: Arc<dyn ChangeSubscriber>) -> SubscriberId {
        let id = SubscriberId(self.next_id.fetch_add(1, Ordering::Relaxed));
        crate::debug_event!("dispatcher", "subscribed", "{} as {id:?}", subscriber.name());
        self.subscribers.write().push((id, subscriber));
        id
    }

    /// Remove a subscriber. Unknown ids are ignored.
    pub fn off_change(&self, id: SubscriberId) -> bool {
        let mut subscribers = self.subscribers.write();
        let before = subscribers.len();
        subscribers.retain(|(sid, _)| *sid != id);
        subscribers.len() != before
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().len()
    }

    /// Cancel `cancel` so that no dispatch driven by it starts another step.
    pub fn halt(&self, cancel: &CancellationToken) {
        let _gate = self.gate.write();
        cancel.cancel();
    }

    /// Handle one settled path, unless `cancel` is already cancelled.
    pub async fn dispatch(&self, path: &Path, cancel: &CancellationToken) -> DispatchOutcome {
        let mut outcome = DispatchOutcome::default();

        {
            let _gate = self.gate.read();
            if cancel.is_cancelled() {
                outcome.skipped = self.subscriber_count();
                return outcome;
            }
            if let Some(cache) = &self.cache {
                cache.invalidate(path);
            }
        }

        // Snapshot so no lock is held across subscriber awaits
        let subscribers: Vec<_> = self
            .subscribers
            .read()
            .iter()
            .map(|(_, s)| Arc::clone(s))
            .collect();

        for (index, subscriber) in subscribers.iter().enumerate() {
            let task = {
                let _gate = self.gate.read();
                if cancel.is_cancelled() {
                    outcome.skipped = subscribers.len() - index;
                    break;
                }
                let owned = path.to_path_buf();
                let task_sub = Arc::clone(subscriber);
                tokio::spawn(async move { task_sub.on_change(&owned).await })
            };

            let reason = match task.await {
                Ok(Ok(())) => {
                    outcome.delivered += 1;
                    continue;
                }
                Ok(Err(e)) => format!("{e:#}"),
                Err(join) if join.is_panic() => "subscriber panicked".to_string(),
                Err(join) => join.to_string(),
            };

            outcome.failed += 1;
            let err = WatchError::SubscriberFailed {
                subscriber: subscriber.name().to_string(),
                path: path.to_path_buf(),
                reason,
            };
            tracing::error!("[dispatcher] {err}");
        }

        if outcome.skipped > 0 {
            crate::debug_event!(
                "dispatcher",
                "halted",
                "{} subscribers skipped for {}",
                outcome.skipped,
                path.display()
            );
        }
        outcome
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("has_cache", &self.cache.is_some())
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}
