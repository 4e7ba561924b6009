//! Command implementations for the CLI.
//!
//! Each command is implemented in its own module.

pub mod estimate;
pub mod init;
pub mod watch;

use std::path::{Path, PathBuf};

use anyhow::Context;

use crate::project::detect_project_root;

/// Resolve an optional CLI path argument to an existing directory.
///
/// Without an argument the project root is detected from the current
/// directory.
pub fn resolve_root(path: Option<&Path>) -> anyhow::Result<PathBuf> {
    match path {
        Some(path) => std::fs::canonicalize(path)
            .with_context(|| format!("cannot resolve {}", path.display())),
        None => Ok(detect_project_root(None)),
    }
}
