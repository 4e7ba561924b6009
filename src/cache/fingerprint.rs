//! File fingerprints and the rule that compares them.

use std::fmt;
use std::fs;
use std::io;
use std::path::Path;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

/// Modification time and size of a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeFingerprint {
    pub mtime: SystemTime,
    pub size: u64,
}

impl SizeFingerprint {
    /// Stat `path`. Fails when the path is absent; never reports zeros.
    pub fn of(path: &Path) -> io::Result<Self> {
        let meta = fs::metadata(path)?;
        Ok(Self {
            mtime: meta.modified()?,
            size: meta.len(),
        })
    }
}

/// Opaque content hash from a [`ContentHashProvider`](super::ContentHashProvider).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContentHash(String);

impl ContentHash {
    pub fn new(hash: impl Into<String>) -> Self {
        Self(hash.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Everything recorded about a file when its entry was stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fingerprint {
    pub size: SizeFingerprint,
    pub content: Option<ContentHash>,
}

/// How stored and current fingerprints are combined.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FingerprintPolicy {
    /// Fresh only if every fingerprint recorded at store time still
    /// matches. A recorded content hash that can no longer be computed
    /// counts as a mismatch.
    #[default]
    AllAgree,
    /// When both sides have a content hash, it alone decides. Otherwise
    /// the size fingerprint decides. Tolerates checkouts that touch mtime
    /// without changing bytes.
    ContentAuthoritative,
}

impl FingerprintPolicy {
    /// Compare a stored fingerprint against the current state of the file.
    ///
    /// `current_content` is only consulted when `stored.content` is set.
    pub fn is_fresh(
        self,
        stored: &Fingerprint,
        current_size: &SizeFingerprint,
        current_content: impl FnOnce() -> Option<ContentHash>,
    ) -> bool {
        let size_matches = stored.size == *current_size;

        match (self, &stored.content) {
            (_, None) => size_matches,
            (FingerprintPolicy::AllAgree, Some(stored_hash)) => {
                size_matches && current_content().as_ref() == Some(stored_hash)
            }
            (FingerprintPolicy::ContentAuthoritative, Some(stored_hash)) => match current_content() {
                Some(current) => current == *stored_hash,
                None => size_matches,
            },
        }
    }
}
