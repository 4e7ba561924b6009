//! Watch command - run the watcher until Ctrl-C.

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;

use crate::cache::ArtifactCache;
use crate::config::Settings;
use crate::watcher::{CacheInvalidator, FileWatcherBuilder};

/// Run the watch command.
///
/// Every settled path is printed on stdout. The cache holds each file's
/// length as its artifact, refreshed after every settlement.
pub async fn run(path: Option<&Path>, settings: &Settings) -> anyhow::Result<()> {
    let root = super::resolve_root(path)?;

    let content = settings.cache.content_hash.provider(&root);
    let mut cache = ArtifactCache::<u64>::new().with_policy(settings.cache.policy);
    if let Some(provider) = content {
        cache = cache.with_content_provider(provider);
    }
    let cache = Arc::new(cache);

    let watcher = FileWatcherBuilder::from_config(&settings.watcher)
        .cache(cache.clone() as Arc<dyn CacheInvalidator>)
        .build();

    let subscriber_cache = cache.clone();
    watcher.on_change_fn("cli", move |path| {
        let cache = subscriber_cache.clone();
        async move {
            // Stat and content hashing block, keep them off the runtime
            let refreshed = tokio::task::spawn_blocking(move || {
                let status = refresh(&cache, &path);
                (path, status)
            })
            .await?;

            match refreshed {
                (path, Refresh::File(len)) => {
                    println!("changed  {} ({len} bytes)", path.display())
                }
                (path, Refresh::Other) => println!("changed  {}", path.display()),
                (path, Refresh::Removed) => println!("removed  {}", path.display()),
            }
            Ok::<(), anyhow::Error>(())
        }
    });

    let verdict = watcher
        .watch_directory(&root)
        .await
        .with_context(|| format!("cannot watch {}", root.display()))?;

    eprintln!(
        "Watching {} (~{} files). Press Ctrl-C to stop.",
        root.display(),
        verdict.estimate
    );

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for Ctrl-C")?;

    watcher.stop();
    eprintln!("Stopped. {} cached entries.", cache.len());
    Ok(())
}

enum Refresh {
    File(u64),
    Other,
    Removed,
}

/// Re-fingerprint a settled path, storing its length as the artifact.
fn refresh(cache: &ArtifactCache<u64>, path: &Path) -> Refresh {
    match std::fs::metadata(path) {
        Ok(meta) if meta.is_file() => {
            cache.set(path, meta.len());
            Refresh::File(meta.len())
        }
        Ok(_) => Refresh::Other,
        Err(_) => Refresh::Removed,
    }
}
