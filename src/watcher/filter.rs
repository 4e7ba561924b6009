//! Segment-based path exclusion.
//!
//! A path is excluded when any segment of it, relative to the watch root,
//! matches one of the configured names exactly. The root itself is never
//! excluded, even when its own basename is on the list.

use std::collections::HashSet;
use std::ffi::OsStr;
use std::path::{Component, Path};

/// Directory names ignored by default: dependency caches, build output and
/// VCS metadata.
pub const DEFAULT_EXCLUDES: &[&str] = &[
    "node_modules",
    ".git",
    ".cache",
    ".npm",
    "dist",
    "build",
    ".next",
    ".turbo",
    "coverage",
    "target",
];

/// Decides whether a path under a watch root should be observed.
#[derive(Debug, Clone)]
pub struct PathFilter {
    excluded: HashSet<String>,
}

impl PathFilter {
    /// Create a filter from a list of excluded segment names.
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            excluded: names.into_iter().map(Into::into).collect(),
        }
    }

    /// Check a single path segment against the excluded set.
    pub fn is_excluded_name(&self, name: &OsStr) -> bool {
        name.to_str().is_some_and(|n| self.excluded.contains(n))
    }

    /// Should events for `path` be dropped?
    ///
    /// Paths that do not live under `root` are always excluded since no
    /// subscription on `root` can legitimately report them.
    pub fn should_exclude(&self, path: &Path, root: &Path) -> bool {
        let Ok(relative) = path.strip_prefix(root) else {
            return true;
        };

        relative.components().any(|component| match component {
            Component::Normal(segment) => self.is_excluded_name(segment),
            _ => false,
        })
    }

    pub fn excluded_names(&self) -> impl Iterator<Item = &str> {
        self.excluded.iter().map(String::as_str)
    }
}

impl Default for PathFilter {
    fn default() -> Self {
        Self::new(DEFAULT_EXCLUDES.iter().copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_excludes_any_matching_segment() {
        let filter = PathFilter::default();
        let root = PathBuf::from("/project");

        assert!(filter.should_exclude(Path::new("/project/node_modules/lodash/index.js"), &root));
        assert!(filter.should_exclude(Path::new("/project/packages/app/dist/main.js"), &root));
        assert!(filter.should_exclude(Path::new("/project/.git/HEAD"), &root));
        assert!(!filter.should_exclude(Path::new("/project/src/main.ts"), &root));
    }

    #[test]
    fn test_segment_match_is_exact() {
        let filter = PathFilter::default();
        let root = PathBuf::from("/project");

        assert!(!filter.should_exclude(Path::new("/project/builder/mod.rs"), &root));
        assert!(!filter.should_exclude(Path::new("/project/src/dist.rs"), &root));
        assert!(!filter.should_exclude(Path::new("/project/my.git/file"), &root));
    }

    #[test]
    fn test_root_basename_is_not_excluded() {
        let filter = PathFilter::default();
        let root = PathBuf::from("/work/build");

        assert!(!filter.should_exclude(&root, &root));
        assert!(!filter.should_exclude(Path::new("/work/build/src/lib.rs"), &root));
        assert!(filter.should_exclude(Path::new("/work/build/build/out.o"), &root));
    }

    #[test]
    fn test_paths_outside_root_are_excluded() {
        let filter = PathFilter::default();
        assert!(filter.should_exclude(Path::new("/elsewhere/file.rs"), Path::new("/project")));
    }

    #[test]
    fn test_custom_names() {
        let filter = PathFilter::new(["vendor"]);
        let root = PathBuf::from("/p");

        assert!(filter.should_exclude(Path::new("/p/vendor/x.go"), &root));
        assert!(!filter.should_exclude(Path::new("/p/node_modules/x.js"), &root));
    }
}
