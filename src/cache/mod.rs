//! Artifact cache kept consistent with the filesystem.
//!
//! Artifacts are visible only while the fingerprint recorded at store time
//! (mtime and size, optionally a content hash) still describes the file.

mod content;
mod fingerprint;
mod store;

pub use content::{ContentHashMode, ContentHashProvider, GitHashProvider, Sha256HashProvider};
pub use fingerprint::{ContentHash, Fingerprint, FingerprintPolicy, SizeFingerprint};
pub use store::ArtifactCache;
