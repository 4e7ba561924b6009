//! Normalized change events.
//!
//! notify reports several event shapes per backend. They are folded into a
//! single [`ChangeEvent`] at the subscription boundary so nothing downstream
//! branches on the backend.

use std::path::{Path, PathBuf};

use notify::event::{AccessKind, AccessMode, EventKind, ModifyKind};
use tokio::time::Instant;

/// Coarse kind of change, kept for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Created,
    Modified,
    Removed,
    Renamed,
    Other,
}

impl ChangeKind {
    /// Map a notify event kind. Returns `None` for pure reads, which never
    /// change file state.
    pub fn from_notify(kind: &EventKind) -> Option<Self> {
        match kind {
            EventKind::Create(_) => Some(ChangeKind::Created),
            EventKind::Remove(_) => Some(ChangeKind::Removed),
            EventKind::Modify(ModifyKind::Name(_)) => Some(ChangeKind::Renamed),
            EventKind::Modify(_) => Some(ChangeKind::Modified),
            EventKind::Access(AccessKind::Close(AccessMode::Write)) => Some(ChangeKind::Modified),
            EventKind::Access(_) => None,
            EventKind::Any | EventKind::Other => Some(ChangeKind::Other),
        }
    }
}

/// A single observed change to one path.
#[derive(Debug, Clone)]
pub struct ChangeEvent {
    pub path: PathBuf,
    pub kind: ChangeKind,
    pub observed_at: Instant,
}

impl ChangeEvent {
    pub fn new(path: PathBuf, kind: ChangeKind) -> Self {
        Self {
            path,
            kind,
            observed_at: Instant::now(),
        }
    }

    /// Normalize a raw notify event reported for `root`.
    ///
    /// Relative names are joined onto the root. Events without a usable
    /// path, and read-only access events, yield nothing.
    pub fn from_notify(root: &Path, event: notify::Event) -> Vec<ChangeEvent> {
        let Some(kind) = ChangeKind::from_notify(&event.kind) else {
            return Vec::new();
        };

        event
            .paths
            .into_iter()
            .filter(|p| !p.as_os_str().is_empty())
            .map(|p| {
                let path = if p.is_absolute() { p } else { root.join(p) };
                ChangeEvent::new(path, kind)
            })
            .collect()
    }
}
