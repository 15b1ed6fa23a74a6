//! Selector resolution cache - remote lookups persisted across runs

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::{Mutex as AsyncMutex, OnceCell, RwLock};
use tracing::{debug, warn};

use super::resolver::SignatureSource;
use crate::domain::abi::normalize_hex_key;
use crate::store::SelectorStore;

/// Default bound on a single remote query
pub const DEFAULT_LOOKUP_TIMEOUT: Duration = Duration::from_secs(3);

struct CacheState {
    entries: RwLock<HashMap<String, Vec<String>>>,
    store: Option<Mutex<SelectorStore>>,
}

/// Selector -> candidate signatures, backed by remote databases
///
/// The map is loaded from the store on first use. Every remote outcome,
/// including "nothing found", is cached and written through immediately, so
/// a selector is only ever queried remotely once. Concurrent misses for the
/// same selector share a single remote query.
pub struct SelectorCache {
    sources: Vec<Arc<dyn SignatureSource>>,
    timeout: Duration,
    store_path: Option<PathBuf>,
    max_age_days: Option<u32>,
    state: OnceCell<CacheState>,
    in_flight: AsyncMutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl SelectorCache {
    /// Memory-only cache over the given sources (priority order)
    pub fn new(sources: Vec<Arc<dyn SignatureSource>>) -> Self {
        Self {
            sources,
            timeout: DEFAULT_LOOKUP_TIMEOUT,
            store_path: None,
            max_age_days: None,
            state: OnceCell::new(),
            in_flight: AsyncMutex::new(HashMap::new()),
        }
    }

    /// Cache with no remote sources; lookups only ever hit persisted entries
    pub fn offline() -> Self {
        Self::new(Vec::new())
    }

    /// Persist to a SQLite file; an absent file is an empty cache
    pub fn with_store_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.store_path = Some(path.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Drop persisted lookups older than this many days when the store is opened
    pub fn with_max_age_days(mut self, days: u32) -> Self {
        self.max_age_days = Some(days);
        self
    }

    /// Candidate signatures for a selector, querying remotely on a miss
    pub async fn lookup(&self, selector: &str) -> Vec<String> {
        let key = normalize_hex_key(selector);
        let state = self.state().await;

        if let Some(hit) = state.entries.read().await.get(&key) {
            return hit.clone();
        }

        if self.sources.is_empty() {
            // Offline: nothing learned, nothing to record
            return Vec::new();
        }

        let gate = {
            let mut in_flight = self.in_flight.lock().await;
            Arc::clone(in_flight.entry(key.clone()).or_default())
        };
        let permit = gate.lock().await;

        // Another task may have finished the same lookup while we waited
        if let Some(hit) = state.entries.read().await.get(&key) {
            return hit.clone();
        }

        let signatures = self.query_remote(&key).await;
        state
            .entries
            .write()
            .await
            .insert(key.clone(), signatures.clone());
        Self::persist(state, &key, &signatures);

        drop(permit);
        self.in_flight.lock().await.remove(&key);

        signatures
    }

    /// Cached entry without any remote I/O
    pub async fn cached(&self, selector: &str) -> Option<Vec<String>> {
        let key = normalize_hex_key(selector);
        self.state().await.entries.read().await.get(&key).cloned()
    }

    /// Number of cached selectors (including "not found" entries)
    pub async fn len(&self) -> usize {
        self.state().await.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// First non-empty answer in source order; failures count as empty
    async fn query_remote(&self, key: &str) -> Vec<String> {
        for source in &self.sources {
            match tokio::time::timeout(self.timeout, source.lookup(key)).await {
                Ok(Ok(signatures)) if !signatures.is_empty() => {
                    debug!(source = source.name(), selector = key, count = signatures.len(), "signatures found");
                    return signatures;
                }
                Ok(Ok(_)) => {
                    debug!(source = source.name(), selector = key, "no signatures");
                }
                Ok(Err(err)) => {
                    warn!(source = source.name(), selector = key, error = %err, "signature lookup failed");
                }
                Err(_) => {
                    warn!(source = source.name(), selector = key, timeout = ?self.timeout, "signature lookup timed out");
                }
            }
        }
        Vec::new()
    }

    async fn state(&self) -> &CacheState {
        self.state
            .get_or_init(|| async { self.load_state() })
            .await
    }

    fn load_state(&self) -> CacheState {
        let Some(path) = &self.store_path else {
            return CacheState {
                entries: RwLock::new(HashMap::new()),
                store: None,
            };
        };

        if let Some(parent) = path.parent() {
            if let Err(err) = std::fs::create_dir_all(parent) {
                warn!(path = %parent.display(), error = %err, "failed to create selector cache directory");
            }
        }

        let opened = SelectorStore::open(path).and_then(|mut store| {
            if let Some(days) = self.max_age_days {
                let pruned = store.cleanup_old_entries(days)?;
                if pruned > 0 {
                    debug!(path = %path.display(), pruned, max_age_days = days, "expired selector lookups removed");
                }
            }
            let entries = store.load_all()?;
            Ok((store, entries))
        });

        match opened {
            Ok((store, entries)) => {
                let signatures: usize = entries.values().map(Vec::len).sum();
                debug!(path = %path.display(), entries = entries.len(), signatures, "selector cache loaded");
                CacheState {
                    entries: RwLock::new(entries),
                    store: Some(Mutex::new(store)),
                }
            }
            Err(err) => {
                warn!(path = %path.display(), error = %err, "selector cache disabled, running in memory");
                CacheState {
                    entries: RwLock::new(HashMap::new()),
                    store: None,
                }
            }
        }
    }

    fn persist(state: &CacheState, key: &str, signatures: &[String]) {
        let Some(store) = &state.store else {
            return;
        };
        let mut store = store.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Err(err) = store.save(key, signatures) {
            warn!(selector = key, error = %err, "failed to persist selector lookup");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Canned {
        name: &'static str,
        answer: Option<Vec<String>>,
        delay: Duration,
        calls: AtomicUsize,
    }

    impl Canned {
        fn new(name: &'static str, answer: Option<Vec<&str>>) -> Arc<Self> {
            Arc::new(Self {
                name,
                answer: answer.map(|a| a.into_iter().map(String::from).collect()),
                delay: Duration::ZERO,
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl SignatureSource for Canned {
        fn name(&self) -> &str {
            self.name
        }

        async fn lookup(&self, _selector: &str) -> anyhow::Result<Vec<String>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            self.answer.clone().ok_or_else(|| anyhow::anyhow!("unreachable"))
        }
    }

    fn sources(list: &[&Arc<Canned>]) -> Vec<Arc<dyn SignatureSource>> {
        list.iter()
            .map(|source| Arc::clone(source) as Arc<dyn SignatureSource>)
            .collect()
    }

    fn temp_db(name: &str) -> PathBuf {
        let mut path = std::env::temp_dir();
        path.push(format!("txinspect_{}_{}.db", name, std::process::id()));
        std::fs::remove_file(&path).ok();
        path
    }

    #[tokio::test]
    async fn test_first_non_empty_source_wins() {
        let failing = Canned::new("failing", None);
        let empty = Canned::new("empty", Some(vec![]));
        let good = Canned::new("good", Some(vec!["foo()", "bar()"]));
        let unused = Canned::new("unused", Some(vec!["baz()"]));
        let cache = SelectorCache::new(sources(&[&failing, &empty, &good, &unused]));

        assert_eq!(cache.lookup("0x12345678").await, vec!["foo()", "bar()"]);
        assert_eq!(failing.calls(), 1);
        assert_eq!(empty.calls(), 1);
        assert_eq!(unused.calls(), 0);
    }

    #[tokio::test]
    async fn test_miss_cached_including_empty() {
        let empty = Canned::new("empty", Some(vec![]));
        let cache = SelectorCache::new(sources(&[&empty]));

        assert!(cache.lookup("DEADBEEF").await.is_empty());
        assert!(cache.lookup("0xdeadbeef").await.is_empty());
        assert_eq!(empty.calls(), 1);
        assert_eq!(cache.cached("0xdeadbeef").await, Some(Vec::new()));
    }

    #[tokio::test]
    async fn test_timeout_is_empty() {
        let slow = Arc::new(Canned {
            name: "slow",
            answer: Some(vec!["late()".to_string()]),
            delay: Duration::from_secs(5),
            calls: AtomicUsize::new(0),
        });
        let cache = SelectorCache::new(sources(&[&slow])).with_timeout(Duration::from_millis(20));

        assert!(cache.lookup("0x12345678").await.is_empty());
    }

    #[tokio::test]
    async fn test_failed_lookup_cached_as_empty() {
        let failing = Canned::new("failing", None);
        let cache = SelectorCache::new(sources(&[&failing]));

        assert!(cache.lookup("0xcafebabe").await.is_empty());
        assert_eq!(cache.cached("0xcafebabe").await, Some(Vec::new()));
        assert!(cache.lookup("0xcafebabe").await.is_empty());
        assert_eq!(failing.calls(), 1);
    }

    #[tokio::test]
    async fn test_timed_out_lookup_cached_as_empty() {
        let slow = Arc::new(Canned {
            name: "slow",
            answer: Some(vec!["late()".to_string()]),
            delay: Duration::from_secs(5),
            calls: AtomicUsize::new(0),
        });
        let cache = SelectorCache::new(sources(&[&slow])).with_timeout(Duration::from_millis(20));

        assert!(cache.lookup("0x12345678").await.is_empty());
        assert_eq!(cache.cached("0x12345678").await, Some(Vec::new()));
        assert!(cache.lookup("0x12345678").await.is_empty());
        assert_eq!(slow.calls(), 1);
    }

    #[tokio::test]
    async fn test_max_age_keeps_fresh_entries() {
        let path = temp_db("selector_cache_max_age");
        let source = Canned::new("good", Some(vec!["deposit()"]));

        {
            let cache = SelectorCache::new(sources(&[&source])).with_store_path(&path);
            cache.lookup("0xd0e30db0").await;
        }

        let reopened = SelectorCache::offline().with_store_path(&path).with_max_age_days(30);
        assert_eq!(reopened.cached("0xd0e30db0").await, Some(vec!["deposit()".to_string()]));

        std::fs::remove_file(path).ok();
    }

    #[tokio::test]
    async fn test_concurrent_misses_share_one_query() {
        let slow = Arc::new(Canned {
            name: "slow",
            answer: Some(vec!["x()".to_string()]),
            delay: Duration::from_millis(50),
            calls: AtomicUsize::new(0),
        });
        let cache = SelectorCache::new(sources(&[&slow]));

        let (a, b) = tokio::join!(cache.lookup("0x11111111"), cache.lookup("0x11111111"));
        assert_eq!(a, b);
        assert_eq!(slow.calls(), 1);
    }

    #[tokio::test]
    async fn test_persisted_across_instances() {
        let path = temp_db("selector_cache");
        let source = Canned::new("good", Some(vec!["deposit()"]));

        {
            let cache = SelectorCache::new(sources(&[&source])).with_store_path(&path);
            assert_eq!(cache.lookup("0xd0e30db0").await, vec!["deposit()"]);
        }

        let offline = SelectorCache::offline().with_store_path(&path);
        assert_eq!(offline.lookup("0xd0e30db0").await, vec!["deposit()"]);
        assert_eq!(source.calls(), 1);

        std::fs::remove_file(path).ok();
    }

    #[tokio::test]
    async fn test_absent_file_is_empty_cache() {
        let path = temp_db("selector_cache_absent");
        let cache = SelectorCache::offline().with_store_path(&path);

        assert!(cache.is_empty().await);
        assert!(cache.lookup("0x12345678").await.is_empty());

        std::fs::remove_file(path).ok();
    }
}
