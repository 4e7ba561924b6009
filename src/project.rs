//! Project root detection.
//!
//! Decides which directory to watch when the caller does not say. Watching
//! too wide a tree is refused by the size guard, so detection prefers the
//! nearest directory that looks like a project.

use std::path::{Path, PathBuf};

/// Overrides detection when set.
pub const ROOT_ENV_VAR: &str = "FRESHWATCH_ROOT";

/// Entries whose presence marks a project root.
pub const ROOT_INDICATORS: &[&str] = &[".git", "Cargo.toml", "package.json", "pyproject.toml"];

/// Find the project root for `start` (or the current directory).
///
/// Order: `FRESHWATCH_ROOT`, then the nearest ancestor containing a root
/// indicator, then the start directory itself. Never fails.
pub fn detect_project_root(start: Option<&Path>) -> PathBuf {
    if let Some(root) = std::env::var_os(ROOT_ENV_VAR).filter(|v| !v.is_empty()) {
        let root = absolute(Path::new(&root));
        crate::debug_event!("project", "root from env", "{}", root.display());
        return root;
    }

    let start = match start {
        Some(path) => absolute(path),
        None => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    };

    match find_root_from(&start) {
        Some(found) => {
            crate::debug_event!("project", "root detected", "{}", found.display());
            found
        }
        None => {
            crate::debug_event!("project", "no indicator found, using", "{}", start.display());
            start
        }
    }
}

/// Nearest ancestor of `start` (inclusive) holding a root indicator.
pub fn find_root_from(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|dir| ROOT_INDICATORS.iter().any(|marker| dir.join(marker).exists()))
        .map(Path::to_path_buf)
}

fn absolute(path: &Path) -> PathBuf {
    std::fs::canonicalize(path)
        .or_else(|_| std::path::absolute(path))
        .unwrap_or_else(|_| path.to_path_buf())
}
