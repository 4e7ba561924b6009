//! Per-path debouncing of change events.
//!
//! Debounce-by-reset: every event for a path pushes its deadline a full
//! quiet period into the future. A path settles only once no event for it
//! has arrived for the whole quiet period, so a file that is written
//! continuously never settles.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use tokio::time::Instant;


/// Debounces file change events by path.
///
/// Holds at most one entry per path. The owner drives it: `record` on
/// every event, `take_ready` whenever `next_deadline` passes.
#[derive(Debug)]
pub struct Debouncer {
    /// Settle deadline per path.
    pending: HashMap<PathBuf, Instant>,
    quiet: Duration,
}

impl Debouncer {
    /// Create a new debouncer with the given quiet period in milliseconds.
    pub fn new(debounce_ms: u64) -> Self {
        Self::with_quiet_period(Duration::from_millis(debounce_ms))
    }

    pub fn with_quiet_period(quiet: Duration) -> Self {
        Self {
            pending: HashMap::new(),
            quiet,
        }
    }

    pub fn quiet_period(&self) -> Duration {
        self.quiet
    }

    /// Record a change for `path`, replacing any pending timer.
    ///
    /// Returns `true` when an existing timer was replaced.
    pub fn record(&mut self, path: PathBuf) -> bool {
        let deadline = Instant::now() + self.quiet;
        self.pending.insert(path, deadline).is_some()
    }

    /// Remove and return every path whose quiet period has elapsed,
    /// earliest deadline first.
    pub fn take_ready(&mut self) -> Vec<PathBuf> {
        let now = Instant::now();
        let mut ready = Vec::new();

        self.pending.retain(|path, deadline| {
            if *deadline <= now {
                ready.push((*deadline, path.clone()));
                false
            } else {
                true
            }
        });

        ready.sort();
        ready.into_iter().map(|(_, path)| path).collect()
    }

    /// Earliest pending deadline, if any.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending.values().min().copied()
    }

    /// Cancel every pending timer without settling any of them.
    pub fn clear(&mut self) -> usize {
        let dropped = self.pending.len();
        self.pending.clear();
        dropped
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }
}
