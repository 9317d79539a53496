use dashmap::DashMap;
use docgraph_core::{content_hash, CacheSettings, ModuleInfo, ParserAdapter, Result};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tracing::{debug, warn};

/// A cached parse result. Valid only while the stored content hash
/// matches the file's current bytes; size and mtime are kept so that
/// unchanged files can be confirmed without re-hashing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    pub info: ModuleInfo,
    pub file_hash: String,
    pub file_size: u64,
    pub mtime: SystemTime,
    pub created_at: SystemTime,
    #[serde(skip)]
    last_access: u64,
}

impl CacheEntry {
    fn is_expired(&self, ttl: Option<Duration>) -> bool {
        match ttl {
            Some(ttl) => self
                .created_at
                .elapsed()
                .map(|age| age >= ttl)
                .unwrap_or(true),
            None => false,
        }
    }
}

/// Cache performance counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub entries: usize,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        if self.hits + self.misses == 0 {
            0.0
        } else {
            self.hits as f64 / (self.hits + self.misses) as f64
        }
    }
}

struct CacheState {
    entries: HashMap<PathBuf, CacheEntry>,
    tick: u64,
    hits: u64,
    misses: u64,
    evictions: u64,
}

/// Content-hash-keyed cache in front of the parser adapters.
///
/// Validation: an entry is served only if its TTL has not elapsed and
/// the file is unchanged. Unchanged is confirmed cheaply by size+mtime;
/// when the metadata differs the content hash is the authoritative
/// check, so a touched-but-identical file still hits. Bounded by an
/// entry-count ceiling with least-recently-used eviction.
///
/// Concurrent `get_or_parse` calls for the same path are serialized
/// through a per-key gate; the second caller reuses the first one's
/// freshly stored result instead of parsing again.
pub struct ParseCache {
    state: Mutex<CacheState>,
    inflight: DashMap<PathBuf, Arc<tokio::sync::Mutex<()>>>,
    max_entries: usize,
    ttl: Option<Duration>,
}

impl ParseCache {
    pub fn new(settings: &CacheSettings) -> Self {
        Self {
            state: Mutex::new(CacheState {
                entries: HashMap::new(),
                tick: 0,
                hits: 0,
                misses: 0,
                evictions: 0,
            }),
            inflight: DashMap::new(),
            max_entries: settings.max_entries.max(1),
            ttl: settings.ttl_secs.map(Duration::from_secs),
        }
    }

    /// Return the parsed `ModuleInfo` for `path`, re-parsing through
    /// `adapter` only when the cached entry is missing or stale. A parse
    /// failure is returned to the caller and never cached.
    pub async fn get_or_parse(
        &self,
        path: &Path,
        adapter: &dyn ParserAdapter,
    ) -> Result<ModuleInfo> {
        let gate = self
            .inflight
            .entry(path.to_path_buf())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone();
        let _guard = gate.lock().await;

        let metadata = tokio::fs::metadata(path).await?;
        let file_size = metadata.len();
        let mtime = metadata.modified()?;

        // Cheap path: unchanged metadata means unchanged content.
        let mut stored_hash = None;
        {
            let mut state = self.state.lock();
            match state.entries.get(path) {
                Some(entry) if entry.is_expired(self.ttl) => {
                    debug!("cache entry expired: {}", path.display());
                    state.entries.remove(path);
                    state.evictions += 1;
                }
                Some(entry) if entry.file_size == file_size && entry.mtime == mtime => {
                    let info = entry.info.clone();
                    state.hits += 1;
                    let tick = state.next_tick();
                    state.entries.get_mut(path).unwrap().last_access = tick;
                    return Ok(info);
                }
                Some(entry) => {
                    stored_hash = Some(entry.file_hash.clone());
                }
                None => {}
            }
        }

        let content = tokio::fs::read_to_string(path).await?;
        let hash = content_hash(content.as_bytes());

        // Metadata changed but content did not (file was touched):
        // still a hit, refresh the stored metadata.
        if stored_hash.as_deref() == Some(hash.as_str()) {
            let mut state = self.state.lock();
            if let Some(entry) = state.entries.get_mut(path) {
                entry.file_size = file_size;
                entry.mtime = mtime;
                let info = entry.info.clone();
                state.hits += 1;
                let tick = state.next_tick();
                state.entries.get_mut(path).unwrap().last_access = tick;
                return Ok(info);
            }
        }

        let info = adapter.parse(path, &content).await.map_err(|e| {
            warn!("parse failed for {}: {}", path.display(), e);
            e
        })?;

        let mut state = self.state.lock();
        state.misses += 1;
        if stored_hash.is_some() {
            // Stale entry is replaced, not just overwritten silently.
            state.evictions += 1;
        }
        let tick = state.next_tick();
        state.entries.insert(
            path.to_path_buf(),
            CacheEntry {
                info: info.clone(),
                file_hash: hash,
                file_size,
                mtime,
                created_at: SystemTime::now(),
                last_access: tick,
            },
        );
        self.evict_over_capacity(&mut state);
        Ok(info)
    }

    fn evict_over_capacity(&self, state: &mut CacheState) {
        while state.entries.len() > self.max_entries {
            let lru = state
                .entries
                .iter()
                .min_by_key(|(_, e)| e.last_access)
                .map(|(k, _)| k.clone());
            match lru {
                Some(key) => {
                    debug!("evicting least-recently-used entry: {}", key.display());
                    state.entries.remove(&key);
                    state.evictions += 1;
                }
                None => break,
            }
        }
    }

    pub fn invalidate(&self, path: &Path) {
        let mut state = self.state.lock();
        if state.entries.remove(path).is_some() {
            state.evictions += 1;
        }
    }

    pub fn clear(&self) {
        let mut state = self.state.lock();
        let removed = state.entries.len() as u64;
        state.entries.clear();
        state.evictions += removed;
    }

    pub fn stats(&self) -> CacheStats {
        let state = self.state.lock();
        CacheStats {
            hits: state.hits,
            misses: state.misses,
            evictions: state.evictions,
            entries: state.entries.len(),
        }
    }

    pub(crate) fn export_entries(&self) -> Vec<(PathBuf, CacheEntry)> {
        let state = self.state.lock();
        state
            .entries
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    pub(crate) fn import_entries(&self, entries: Vec<(PathBuf, CacheEntry)>) {
        let mut state = self.state.lock();
        for (path, mut entry) in entries {
            if entry.is_expired(self.ttl) {
                continue;
            }
            let tick = state.next_tick();
            entry.last_access = tick;
            state.entries.insert(path, entry);
        }
        self.evict_over_capacity(&mut state);
    }
}

impl CacheState {
    fn next_tick(&mut self) -> u64 {
        self.tick += 1;
        self.tick
    }
}

impl std::fmt::Debug for ParseCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let stats = self.stats();
        f.debug_struct("ParseCache")
            .field("entries", &stats.entries)
            .field("max_entries", &self.max_entries)
            .field("ttl", &self.ttl)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use docgraph_core::{DocGraphError, Language};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    struct CountingAdapter {
        calls: AtomicUsize,
        fail: bool,
    }

    impl CountingAdapter {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail: false,
            }
        }

        fn failing() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail: true,
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ParserAdapter for CountingAdapter {
        fn language(&self) -> Language {
            Language::Python
        }

        async fn parse(&self, path: &Path, content: &str) -> Result<ModuleInfo> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(DocGraphError::Parse {
                    path: path.to_path_buf(),
                    message: "synthetic failure".into(),
                });
            }
            Ok(ModuleInfo {
                path: path.to_path_buf(),
                module_name: path
                    .file_stem()
                    .unwrap()
                    .to_string_lossy()
                    .into_owned(),
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

    fn settings(max_entries: usize, ttl_secs: Option<u64>) -> CacheSettings {
        CacheSettings {
            max_entries,
            ttl_secs,
            snapshot_path: None,
        }
    }

    fn write(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    #[tokio::test]
    async fn unchanged_file_hits_and_yields_identical_info() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "a.py", "import os\n");
        let cache = ParseCache::new(&settings(10, None));
        let adapter = CountingAdapter::new();

        let first = cache.get_or_parse(&path, &adapter).await.unwrap();
        let second = cache.get_or_parse(&path, &adapter).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(adapter.calls(), 1);
        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
    }

    #[tokio::test]
    async fn touched_but_identical_file_still_hits() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "a.py", "import os\n");
        let cache = ParseCache::new(&settings(10, None));
        let adapter = CountingAdapter::new();

        cache.get_or_parse(&path, &adapter).await.unwrap();

        // Rewrite identical bytes so mtime moves but the hash does not.
        tokio::time::sleep(Duration::from_millis(20)).await;
        std::fs::write(&path, "import os\n").unwrap();

        cache.get_or_parse(&path, &adapter).await.unwrap();
        assert_eq!(adapter.calls(), 1, "content unchanged, no reparse");
        assert_eq!(cache.stats().hits, 1);
    }

    #[tokio::test]
    async fn changed_content_evicts_and_reparses() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "a.py", "import os\n");
        let cache = ParseCache::new(&settings(10, None));
        let adapter = CountingAdapter::new();

        cache.get_or_parse(&path, &adapter).await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        std::fs::write(&path, "import sys\nimport os\n").unwrap();

        let info = cache.get_or_parse(&path, &adapter).await.unwrap();
        assert_eq!(info.line_count, 2);
        assert_eq!(adapter.calls(), 2);
        let stats = cache.stats();
        assert_eq!(stats.misses, 2);
        assert_eq!(stats.evictions, 1);
    }

    #[tokio::test]
    async fn capacity_overflow_evicts_exactly_the_lru_entry() {
        let dir = TempDir::new().unwrap();
        let cache = ParseCache::new(&settings(2, None));
        let adapter = CountingAdapter::new();

        let a = write(&dir, "a.py", "x = 1\n");
        let b = write(&dir, "b.py", "x = 2\n");
        let c = write(&dir, "c.py", "x = 3\n");

        cache.get_or_parse(&a, &adapter).await.unwrap();
        cache.get_or_parse(&b, &adapter).await.unwrap();
        // Refresh `a` so `b` becomes least recently used.
        cache.get_or_parse(&a, &adapter).await.unwrap();
        cache.get_or_parse(&c, &adapter).await.unwrap();

        assert_eq!(adapter.calls(), 3);
        // `a` and `c` survive; `b` was evicted and must reparse.
        cache.get_or_parse(&a, &adapter).await.unwrap();
        cache.get_or_parse(&c, &adapter).await.unwrap();
        assert_eq!(adapter.calls(), 3);
        cache.get_or_parse(&b, &adapter).await.unwrap();
        assert_eq!(adapter.calls(), 4);
    }

    #[tokio::test]
    async fn expired_entries_are_misses() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "a.py", "x = 1\n");
        let cache = ParseCache::new(&settings(10, Some(0)));
        let adapter = CountingAdapter::new();

        cache.get_or_parse(&path, &adapter).await.unwrap();
        cache.get_or_parse(&path, &adapter).await.unwrap();
        assert_eq!(adapter.calls(), 2);
        assert_eq!(cache.stats().hits, 0);
    }

    #[tokio::test]
    async fn parse_failures_are_not_cached() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "broken.py", "def oops(\n");
        let cache = ParseCache::new(&settings(10, None));
        let adapter = CountingAdapter::failing();

        assert!(cache.get_or_parse(&path, &adapter).await.is_err());
        assert!(cache.get_or_parse(&path, &adapter).await.is_err());
        assert_eq!(adapter.calls(), 2);
        assert_eq!(cache.stats().entries, 0);
    }

    #[tokio::test]
    async fn concurrent_requests_for_one_key_parse_once() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "a.py", "x = 1\n");
        let cache = Arc::new(ParseCache::new(&settings(10, None)));
        let adapter = Arc::new(CountingAdapter::new());

        let mut handles = Vec::new();
        for _ in 0..8 {
            let cache = cache.clone();
            let adapter = adapter.clone();
            let path = path.clone();
            handles.push(tokio::spawn(async move {
                cache.get_or_parse(&path, adapter.as_ref()).await.unwrap()
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(adapter.calls(), 1);
    }

    #[tokio::test]
    async fn invalidate_forces_reparse() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "a.py", "x = 1\n");
        let cache = ParseCache::new(&settings(10, None));
        let adapter = CountingAdapter::new();

        cache.get_or_parse(&path, &adapter).await.unwrap();
        cache.invalidate(&path);
        cache.get_or_parse(&path, &adapter).await.unwrap();
        assert_eq!(adapter.calls(), 2);
    }
}
