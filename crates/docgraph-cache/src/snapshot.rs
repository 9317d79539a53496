use crate::{CacheEntry, ParseCache};
use docgraph_core::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

const SNAPSHOT_VERSION: u32 = 1;

/// On-disk form of the parse cache. Entries are revalidated against the
/// file system on first use after loading, so a stale snapshot can only
/// cost a re-parse, never serve wrong data.
#[derive(Debug, Serialize, Deserialize)]
struct Snapshot {
    version: u32,
    entries: Vec<SnapshotEntry>,
}

#[derive(Debug, Serialize, Deserialize)]
struct SnapshotEntry {
    path: PathBuf,
    entry: CacheEntry,
}

/// Write the cache contents to `path` as JSON.
pub async fn save_snapshot(cache: &ParseCache, path: &Path) -> Result<()> {
    let snapshot = Snapshot {
        version: SNAPSHOT_VERSION,
        entries: cache
            .export_entries()
            .into_iter()
            .map(|(path, entry)| SnapshotEntry { path, entry })
            .collect(),
    };
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let json = serde_json::to_vec_pretty(&snapshot)?;
    tokio::fs::write(path, json).await?;
    info!(
        "saved cache snapshot with {} entries to {}",
        snapshot.entries.len(),
        path.display()
    );
    Ok(())
}

/// Load a snapshot into the cache. A missing or unreadable snapshot is
/// not an error; the cache simply starts cold.
pub async fn load_snapshot(cache: &ParseCache, path: &Path) -> Result<usize> {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(e.into()),
    };
    let snapshot: Snapshot = match serde_json::from_slice(&bytes) {
        Ok(snapshot) => snapshot,
        Err(e) => {
            warn!("ignoring unreadable cache snapshot {}: {}", path.display(), e);
            return Ok(0);
        }
    };
    if snapshot.version != SNAPSHOT_VERSION {
        warn!(
            "ignoring cache snapshot with unsupported version {}",
            snapshot.version
        );
        return Ok(0);
    }
    let count = snapshot.entries.len();
    cache.import_entries(
        snapshot
            .entries
            .into_iter()
            .map(|e| (e.path, e.entry))
            .collect(),
    );
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use docgraph_core::{
        content_hash, CacheSettings, Language, ModuleInfo, ParserAdapter,
    };
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    struct CountingAdapter(AtomicUsize);

    #[async_trait]
    impl ParserAdapter for CountingAdapter {
        fn language(&self) -> Language {
            Language::Python
        }

        async fn parse(&self, path: &Path, content: &str) -> docgraph_core::Result<ModuleInfo> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(ModuleInfo {
                path: path.to_path_buf(),
                module_name: "m".into(),
                language: Language::Python,
                imports: vec![],
                exports: vec![],
                function_count: 0,
                class_count: 0,
                line_count: content.lines().count(),
                doc_comment: None,
                content_hash: content_hash(content.as_bytes()),
            })
        }
    }

    #[tokio::test]
    async fn snapshot_round_trip_preserves_hits() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("a.py");
        std::fs::write(&source, "x = 1\n").unwrap();
        let snapshot_path = dir.path().join("cache").join("parse.json");

        let settings = CacheSettings {
            max_entries: 10,
            ttl_secs: None,
            snapshot_path: None,
        };

        let warm = ParseCache::new(&settings);
        let adapter = CountingAdapter(AtomicUsize::new(0));
        warm.get_or_parse(&source, &adapter).await.unwrap();
        save_snapshot(&warm, &snapshot_path).await.unwrap();

        let cold = ParseCache::new(&settings);
        let loaded = load_snapshot(&cold, &snapshot_path).await.unwrap();
        assert_eq!(loaded, 1);

        // The reloaded entry validates and serves without a reparse.
        cold.get_or_parse(&source, &adapter).await.unwrap();
        assert_eq!(adapter.0.load(Ordering::SeqCst), 1);
        assert_eq!(cold.stats().hits, 1);
    }

    #[tokio::test]
    async fn missing_snapshot_is_a_cold_start() {
        let dir = TempDir::new().unwrap();
        let cache = ParseCache::new(&CacheSettings::default());
        let loaded = load_snapshot(&cache, &dir.path().join("nope.json"))
            .await
            .unwrap();
        assert_eq!(loaded, 0);
    }
}
