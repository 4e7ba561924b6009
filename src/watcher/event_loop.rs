//! Single-writer settle loop.
//!
//! One task owns the [`Debouncer`]. It receives [`ChangeEvent`]s, resets
//! per-path deadlines, and hands settled paths to the [`Dispatcher`]. Since
//! recording an event and settling a path both happen on this task, a
//! timer replacement can never race its own firing.
//!
//! The dispatcher checks the same cancellation token before every step, so
//! once the token is cancelled no further path reaches a subscriber.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::time::{Instant, sleep_until};
use tokio_util::sync::CancellationToken;

use super::debouncer::Debouncer;
use super::dispatcher::Dispatcher;
use super::event::ChangeEvent;

pub(crate) struct EventLoop {
    events: mpsc::Receiver<ChangeEvent>,
    debouncer: Debouncer,
    dispatcher: Arc<Dispatcher>,
    cancel: CancellationToken,
}

impl EventLoop {
    pub(crate) fn new(
        events: mpsc::Receiver<ChangeEvent>,
        debouncer: Debouncer,
        dispatcher: Arc<Dispatcher>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            events,
            debouncer,
            dispatcher,
            cancel,
        }
    }

    pub(crate) async fn run(mut self) {
        crate::debug_event!(
            "debouncer",
            "started",
            "quiet period {:?}",
            self.debouncer.quiet_period()
        );

        loop {
            let deadline = self.debouncer.next_deadline();

            // Settling is polled before new events, so a flood on one path
            // cannot starve paths whose quiet period already elapsed.
            tokio::select! {
                biased;

                _ = self.cancel.cancelled() => break,

                _ = wait_until(deadline) => {
                    for path in self.debouncer.take_ready() {
                        crate::debug_event!("debouncer", "settled", "{}", path.display());
                        self.dispatcher.dispatch(&path, &self.cancel).await;
                        if self.cancel.is_cancelled() {
                            break;
                        }
                    }
                }

                received = self.events.recv() => {
                    let Some(event) = received else { break };
                    let replaced = self.debouncer.record(event.path.clone());
                    tracing::trace!(
                        "[debouncer] {:?} {} (replaced: {replaced}, pending: {})",
                        event.kind,
                        event.path.display(),
                        self.debouncer.pending_count()
                    );
                }
            }
        }

        let dropped = self.debouncer.clear();
        crate::debug_event!("debouncer", "stopped", "{dropped} pending timers cancelled");
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(at) => sleep_until(at).await,
        None => std::future::pending().await,
    }
}
