//! Fingerprint-gated artifact cache.
//!
//! Entries are keyed by path and hold the fingerprint captured when they
//! were stored plus an optional artifact. There is no "stale" state:
//! invalidation removes the entry, after which the path is
//! indistinguishable from one that was never cached.
//!
//! Key paths the same way the watcher reports them (absolute, resolved),
//! otherwise settlement invalidates a different key than the one stored.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::watcher::CacheInvalidator;

use super::content::ContentHashProvider;
use super::fingerprint::{Fingerprint, FingerprintPolicy, SizeFingerprint};

struct CacheEntry<A> {
    fingerprint: Fingerprint,
    artifact: Option<Arc<A>>,
}

/// Derived artifacts keyed by path, valid while the file's fingerprint
/// matches.
///
/// `get` does not re-check freshness; callers use [`has_changed`](Self::has_changed),
/// or rely on the watcher invalidating changed paths before notifying.
pub struct ArtifactCache<A> {
    entries: RwLock<HashMap<PathBuf, CacheEntry<A>>>,
    content: Option<Arc<dyn ContentHashProvider>>,
    policy: FingerprintPolicy,
}

impl<A> ArtifactCache<A> {
    /// Cache using only mtime and size.
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            content: None,
            policy: FingerprintPolicy::default(),
        }
    }

    /// Also record a content hash for every stored entry.
    pub fn with_content_provider(mut self, provider: Arc<dyn ContentHashProvider>) -> Self {
        self.content = Some(provider);
        self
    }

    pub fn with_policy(mut self, policy: FingerprintPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> FingerprintPolicy {
        self.policy
    }

    /// The stored artifact, if an entry with an artifact exists.
    pub fn get(&self, path: &Path) -> Option<Arc<A>> {
        self.entries
            .read()
            .get(path)
            .and_then(|entry| entry.artifact.clone())
    }

    /// Fingerprint `path` and store `artifact`, replacing any prior entry.
    ///
    /// If the path cannot be stat'ed the prior entry is removed instead and
    /// `false` is returned.
    pub fn set(&self, path: &Path, artifact: A) -> bool {
        self.store(path, Some(Arc::new(artifact)))
    }

    /// Fingerprint `path` without an artifact, replacing any prior entry.
    ///
    /// Pair with [`mutate_artifact`](Self::mutate_artifact) once the artifact
    /// is produced.
    pub fn record(&self, path: &Path) -> bool {
        self.store(path, None)
    }

    /// Replace only the artifact of an existing entry. The fingerprint is
    /// left untouched. Returns `false` when there is no entry.
    pub fn mutate_artifact(&self, path: &Path, artifact: A) -> bool {
        match self.entries.write().get_mut(path) {
            Some(entry) => {
                entry.artifact = Some(Arc::new(artifact));
                true
            }
            None => false,
        }
    }

    /// `true` unless an entry exists and its fingerprint still matches the
    /// file on disk.
    pub fn has_changed(&self, path: &Path) -> bool {
        let Some(stored) = self.fingerprint(path) else {
            return true;
        };
        let Ok(current) = SizeFingerprint::of(path) else {
            return true;
        };

        let fresh = self.policy.is_fresh(&stored, &current, || {
            self.content.as_ref().and_then(|p| p.file_hash(path))
        });
        !fresh
    }

    /// The fingerprint recorded for `path`.
    pub fn fingerprint(&self, path: &Path) -> Option<Fingerprint> {
        self.entries
            .read()
            .get(path)
            .map(|entry| entry.fingerprint.clone())
    }

    /// Remove the entry for `path`. Returns whether one existed.
    pub fn invalidate(&self, path: &Path) -> bool {
        self.entries.write().remove(path).is_some()
    }

    /// Remove every entry. Returns how many were removed.
    pub fn invalidate_all(&self) -> usize {
        let mut entries = self.entries.write();
        let removed = entries.len();
        entries.clear();
        removed
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.entries.read().contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    fn store(&self, path: &Path, artifact: Option<Arc<A>>) -> bool {
        // Stat and hash before taking the lock
        match self.capture(path) {
            Some(fingerprint) => {
                self.entries.write().insert(
                    path.to_path_buf(),
                    CacheEntry {
                        fingerprint,
                        artifact,
                    },
                );
                true
            }
            None => {
                crate::debug_event!("cache", "stat failed, dropping entry", "{}", path.display());
                self.entries.write().remove(path);
                false
            }
        }
    }

    fn capture(&self, path: &Path) -> Option<Fingerprint> {
        let size = SizeFingerprint::of(path).ok()?;
        let content = self.content.as_ref().and_then(|p| p.file_hash(path));
        Some(Fingerprint { size, content })
    }
}

impl<A> Default for ArtifactCache<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A: Send + Sync> CacheInvalidator for ArtifactCache<A> {
    fn invalidate(&self, path: &Path) {
        if ArtifactCache::invalidate(self, path) {
            crate::debug_event!("cache", "invalidated", "{}", path.display());
        }
    }
}

impl<A> std::fmt::Debug for ArtifactCache<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArtifactCache")
            .field("entries", &self.len())
            .field("content", &self.content.as_ref().map(|p| p.name().to_string()))
            .field("policy", &self.policy)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{ContentHash, Sha256HashProvider};
    use filetime::{FileTime, set_file_mtime};
    use std::fs;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_unknown_path_has_changed() {
        let temp = TempDir::new().unwrap();
        let path = write(&temp, "a.ts", "x");
        let cache: ArtifactCache<String> = ArtifactCache::new();

        assert!(cache.has_changed(&path));
        assert!(cache.get(&path).is_none());
    }

    #[test]
    fn test_set_then_unchanged() {
        let temp = TempDir::new().unwrap();
        let path = write(&temp, "a.ts", "export const a = 1;");
        let cache = ArtifactCache::new();

        assert!(cache.set(&path, "ast".to_string()));
        assert!(!cache.has_changed(&path));
        assert_eq!(cache.get(&path).as_deref(), Some(&"ast".to_string()));
    }

    #[test]
    fn test_mtime_change_detected() {
        let temp = TempDir::new().unwrap();
        let path = write(&temp, "file.ts", &"x".repeat(50));
        set_file_mtime(&path, FileTime::from_unix_time(100, 0)).unwrap();

        let cache = ArtifactCache::new();
        cache.set(&path, 1u32);
        assert!(!cache.has_changed(&path));

        set_file_mtime(&path, FileTime::from_unix_time(150, 0)).unwrap();
        assert!(cache.has_changed(&path));

        cache.set(&path, 2u32);
        assert!(!cache.has_changed(&path));
    }

    #[test]
    fn test_size_change_detected() {
        let temp = TempDir::new().unwrap();
        let path = write(&temp, "file.ts", "short");
        set_file_mtime(&path, FileTime::from_unix_time(100, 0)).unwrap();

        let cache = ArtifactCache::new();
        cache.set(&path, ());

        fs::write(&path, "much longer content").unwrap();
        set_file_mtime(&path, FileTime::from_unix_time(100, 0)).unwrap();
        assert!(cache.has_changed(&path));
    }

    #[test]
    fn test_set_on_missing_path_drops_prior_entry() {
        let temp = TempDir::new().unwrap();
        let path = write(&temp, "gone.ts", "x");
        let cache = ArtifactCache::new();

        assert!(cache.set(&path, "old"));
        fs::remove_file(&path).unwrap();

        assert!(!cache.set(&path, "new"));
        assert!(!cache.contains(&path));
        assert!(cache.get(&path).is_none());
    }

    #[test]
    fn test_vanished_file_has_changed() {
        let temp = TempDir::new().unwrap();
        let path = write(&temp, "a.ts", "x");
        let cache = ArtifactCache::new();
        cache.set(&path, 0u8);

        fs::remove_file(&path).unwrap();
        assert!(cache.has_changed(&path));
    }

    #[test]
    fn test_mutate_artifact_keeps_fingerprint() {
        let temp = TempDir::new().unwrap();
        let path = write(&temp, "a.ts", "x");
        let cache = ArtifactCache::new();

        assert!(cache.record(&path));
        assert!(cache.get(&path).is_none());
        let before = cache.fingerprint(&path).unwrap();

        fs::write(&path, "changed on disk").unwrap();
        assert!(cache.mutate_artifact(&path, "parsed"));

        assert_eq!(cache.get(&path).as_deref(), Some(&"parsed"));
        assert_eq!(cache.fingerprint(&path), Some(before));
        assert!(cache.has_changed(&path));
    }

    #[test]
    fn test_mutate_artifact_without_entry_is_noop() {
        let temp = TempDir::new().unwrap();
        let path = write(&temp, "a.ts", "x");
        let cache = ArtifactCache::new();

        assert!(!cache.mutate_artifact(&path, 5));
        assert!(!cache.contains(&path));
    }

    #[test]
    fn test_invalidate_is_total_and_idempotent() {
        let temp = TempDir::new().unwrap();
        let a = write(&temp, "a.ts", "a");
        let b = write(&temp, "b.ts", "b");
        let cache = ArtifactCache::new();
        cache.set(&a, 'a');
        cache.set(&b, 'b');

        assert!(cache.invalidate(&a));
        assert!(!cache.invalidate(&a));
        assert!(cache.get(&a).is_none());
        assert!(cache.has_changed(&a));
        assert!(cache.fingerprint(&a).is_none());

        assert_eq!(cache.invalidate_all(), 1);
        assert_eq!(cache.invalidate_all(), 0);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_content_hash_recorded_and_checked() {
        let temp = TempDir::new().unwrap();
        let path = write(&temp, "a.ts", "abcd");
        set_file_mtime(&path, FileTime::from_unix_time(100, 0)).unwrap();

        let cache = ArtifactCache::new().with_content_provider(Arc::new(Sha256HashProvider));
        cache.set(&path, ());
        assert!(cache.fingerprint(&path).unwrap().content.is_some());
        assert!(!cache.has_changed(&path));

        // Same size and mtime, different bytes
        fs::write(&path, "wxyz").unwrap();
        set_file_mtime(&path, FileTime::from_unix_time(100, 0)).unwrap();
        assert!(cache.has_changed(&path));
    }

    #[test]
    fn test_all_agree_flags_touched_but_identical_file() {
        let temp = TempDir::new().unwrap();
        let path = write(&temp, "a.ts", "same");
        set_file_mtime(&path, FileTime::from_unix_time(100, 0)).unwrap();

        let cache = ArtifactCache::new().with_content_provider(Arc::new(Sha256HashProvider));
        cache.set(&path, ());

        set_file_mtime(&path, FileTime::from_unix_time(200, 0)).unwrap();
        assert!(cache.has_changed(&path));
    }

    #[test]
    fn test_content_authoritative_ignores_touch() {
        let temp = TempDir::new().unwrap();
        let path = write(&temp, "a.ts", "same");
        set_file_mtime(&path, FileTime::from_unix_time(100, 0)).unwrap();

        let cache = ArtifactCache::new()
            .with_content_provider(Arc::new(Sha256HashProvider))
            .with_policy(FingerprintPolicy::ContentAuthoritative);
        cache.set(&path, ());

        set_file_mtime(&path, FileTime::from_unix_time(200, 0)).unwrap();
        assert!(!cache.has_changed(&path));
    }

    struct Unavailable;

    impl ContentHashProvider for Unavailable {
        fn name(&self) -> &str {
            "unavailable"
        }

        fn file_hash(&self, _path: &Path) -> Option<ContentHash> {
            None
        }
    }

    #[test]
    fn test_provider_failure_falls_back_to_size() {
        let temp = TempDir::new().unwrap();
        let path = write(&temp, "a.ts", "x");
        let cache = ArtifactCache::new().with_content_provider(Arc::new(Unavailable));

        assert!(cache.set(&path, ()));
        assert!(cache.fingerprint(&path).unwrap().content.is_none());
        assert!(!cache.has_changed(&path));
    }

    #[test]
    fn test_invalidator_trait_removes_entry() {
        let temp = TempDir::new().unwrap();
        let path = write(&temp, "a.ts", "x");
        let cache = Arc::new(ArtifactCache::new());
        cache.set(&path, 1);

        let invalidator: Arc<dyn CacheInvalidator> = cache.clone();
        invalidator.invalidate(&path);
        assert!(cache.get(&path).is_none());
    }
}
