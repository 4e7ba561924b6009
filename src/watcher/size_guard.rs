//! Bounded estimate of a directory tree's file count.
//!
//! Counting stops as soon as the cap is reached. A capped count is reported
//! as at least the hard threshold: an unfinished scan means "too large",
//! never a precise number.

use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};

use super::error::WatchError;
use super::filter::PathFilter;

/// Files counted before the traversal gives up.
pub const ESTIMATE_CAP: usize = 10_000;
/// Estimates at or above this refuse the watch.
pub const HARD_THRESHOLD: usize = 100_000;
/// Estimates above this watch with a warning.
pub const WARN_THRESHOLD: usize = 5_000;

/// How a tree's estimate compares against the configured thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeLevel {
    Ok,
    /// Above the warn threshold, below the hard one.
    Large,
}

/// Outcome of a successful size check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeVerdict {
    pub estimate: usize,
    pub level: SizeLevel,
}

impl SizeVerdict {
    pub fn is_large(&self) -> bool {
        self.level == SizeLevel::Large
    }
}

/// Pre-flight guard that refuses trees too large to watch safely.
#[derive(Debug, Clone)]
pub struct SizeGuard {
    filter: PathFilter,
    estimate_cap: usize,
    hard_threshold: usize,
    warn_threshold: usize,
}

impl SizeGuard {
    pub fn new(filter: PathFilter) -> Self {
        Self {
            filter,
            estimate_cap: ESTIMATE_CAP,
            hard_threshold: HARD_THRESHOLD,
            warn_threshold: WARN_THRESHOLD,
        }
    }

    pub fn with_limits(mut self, estimate_cap: usize, warn: usize, hard: usize) -> Self {
        self.estimate_cap = estimate_cap;
        self.warn_threshold = warn;
        self.hard_threshold = hard;
        self
    }

    pub fn hard_threshold(&self) -> usize {
        self.hard_threshold
    }

    /// Estimate the number of files under `root`.
    ///
    /// Breadth-first, skipping directories whose name is excluded. Unreadable
    /// directories are skipped silently. Returns the exact count when the
    /// traversal finishes below the cap, otherwise a value at or above the
    /// hard threshold.
    pub fn estimate(&self, root: &Path) -> usize {
        let mut count = 0usize;
        let mut queue: VecDeque<PathBuf> = VecDeque::from([root.to_path_buf()]);

        'scan: while let Some(dir) = queue.pop_front() {
            let Ok(entries) = fs::read_dir(&dir) else {
                continue;
            };

            for entry in entries.flatten() {
                if count >= self.estimate_cap {
                    break 'scan;
                }
                let Ok(file_type) = entry.file_type() else {
                    continue;
                };

                if file_type.is_file() {
                    count += 1;
                } else if file_type.is_dir() && !self.filter.is_excluded_name(&entry.file_name()) {
                    queue.push_back(entry.path());
                }
            }
        }

        if count >= self.estimate_cap {
            count.max(self.hard_threshold)
        } else {
            count
        }
    }

    /// Run the estimate and classify it.
    pub fn check(&self, root: &Path) -> Result<SizeVerdict, WatchError> {
        let estimate = self.estimate(root);

        if estimate >= self.hard_threshold {
            return Err(WatchError::ResourceBoundExceeded {
                root: root.to_path_buf(),
                estimate,
                threshold: self.hard_threshold,
            });
        }

        let level = if estimate > self.warn_threshold {
            SizeLevel::Large
        } else {
            SizeLevel::Ok
        };
        Ok(SizeVerdict { estimate, level })
    }
}

impl Default for SizeGuard {
    fn default() -> Self {
        Self::new(PathFilter::default())
    }
}

/// Estimate with the default exclusions and limits.
pub fn estimate_directory_size(root: &Path) -> usize {
    SizeGuard::default().estimate(root)
}
