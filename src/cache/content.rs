//! Content-hash providers.
//!
//! A provider returns `None` whenever it cannot hash a path. Callers treat
//! that as "no content fingerprint available", never as an error.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::fingerprint::ContentHash;

/// Source of content fingerprints for files.
pub trait ContentHashProvider: Send + Sync {
    /// Provider name for logs.
    fn name(&self) -> &str;

    /// Hash the current content of `path`, or `None` on any failure.
    fn file_hash(&self, path: &Path) -> Option<ContentHash>;
}

/// Git blob hash of the working-tree file (`git hash-object`).
///
/// Identical bytes always produce the same hash, so a branch switch that
/// rewrites a file with unchanged content keeps its hash.
#[derive(Debug, Clone)]
pub struct GitHashProvider {
    repo_root: PathBuf,
}

impl GitHashProvider {
    pub fn new(repo_root: impl Into<PathBuf>) -> Self {
        Self {
            repo_root: repo_root.into(),
        }
    }

    pub fn repo_root(&self) -> &Path {
        &self.repo_root
    }
}

impl ContentHashProvider for GitHashProvider {
    fn name(&self) -> &str {
        "git"
    }

    fn file_hash(&self, path: &Path) -> Option<ContentHash> {
        let output = Command::new("git")
            .arg("hash-object")
            .arg("--")
            .arg(path)
            .current_dir(&self.repo_root)
            .output()
            .ok()?;

        if !output.status.success() {
            tracing::trace!(
                "[cache] git hash-object failed for {}: {}",
                path.display(),
                String::from_utf8_lossy(&output.stderr).trim()
            );
            return None;
        }

        let hash = String::from_utf8_lossy(&output.stdout).trim().to_string();
        (!hash.is_empty()).then(|| ContentHash::new(hash))
    }
}

/// SHA-256 of the file bytes.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sha256HashProvider;

impl ContentHashProvider for Sha256HashProvider {
    fn name(&self) -> &str {
        "sha256"
    }

    fn file_hash(&self, path: &Path) -> Option<ContentHash> {
        let bytes = fs::read(path).ok()?;
        Some(ContentHash::new(format!("{:x}", Sha256::digest(&bytes))))
    }
}

/// Which content provider, if any, the cache should use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentHashMode {
    #[default]
    None,
    Git,
    Sha256,
}

impl ContentHashMode {
    /// Build the provider for this mode. `root` is the repository root for
    /// the git provider.
    pub fn provider(self, root: &Path) -> Option<Arc<dyn ContentHashProvider>> {
        match self {
            ContentHashMode::None => None,
            ContentHashMode::Git => Some(Arc::new(GitHashProvider::new(root))),
            ContentHashMode::Sha256 => Some(Arc::new(Sha256HashProvider)),
        }
    }
}
