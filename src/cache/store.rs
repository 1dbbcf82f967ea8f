//! Bounded in-memory result cache with LRU eviction and TTL expiry.

use super::key::QueryShape;
use crate::sweep::Sweeper;
use crate::{Error, ErrorContext, Result};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::{Duration, Instant};
use tracing::{debug, trace};

/// Cache construction parameters. Fixed for the lifetime of the cache.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Maximum number of live entries.
    pub max_entries: usize,
    /// Age past which an entry must not be served.
    pub ttl: Duration,
    /// Period of the background expiry sweep.
    pub sweep_interval: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 1000,
            ttl: Duration::from_secs(15 * 60),
            sweep_interval: Duration::from_secs(5 * 60),
        }
    }
}

impl CacheConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = max_entries;
        self
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }

    fn validate(&self) -> Result<()> {
        if self.max_entries == 0 {
            return Err(Error::configuration_with_context(
                "cache capacity must be at least one entry",
                ErrorContext::new()
                    .with_field_path("max_entries")
                    .with_source("cache_config"),
            ));
        }
        if self.ttl.is_zero() {
            return Err(Error::configuration_with_context(
                "cache TTL must be non-zero",
                ErrorContext::new()
                    .with_field_path("ttl")
                    .with_source("cache_config"),
            ));
        }
        Ok(())
    }
}

struct CacheEntry<T> {
    payload: T,
    /// Set once at insertion; drives TTL expiry.
    created_at: Instant,
    /// Updated on every hit; drives LRU eviction.
    last_accessed: Instant,
    /// Reads served since insertion. Insertion itself does not count.
    access_count: u64,
}

impl<T> CacheEntry<T> {
    fn new(payload: T) -> Self {
        let now = Instant::now();
        Self {
            payload,
            created_at: now,
            last_accessed: now,
            access_count: 0,
        }
    }

    fn is_expired(&self, ttl: Duration) -> bool {
        self.created_at.elapsed() > ttl
    }
}

/// Payload returned on a cache hit, tagged with hit bookkeeping.
#[derive(Debug, Clone)]
pub struct CacheHit<T> {
    pub payload: T,
    /// Time since the entry was inserted.
    pub age: Duration,
    /// Reads served from this entry, including this one.
    pub access_count: u64,
}

/// Read-only snapshot of table size and monotonic counters.
#[derive(Debug, Clone, Default)]
pub struct CacheStats {
    pub size: usize,
    pub max_entries: usize,
    /// Mean `access_count` over live entries; 0.0 when the table is empty.
    pub average_access_count: f64,
    pub hits: u64,
    pub misses: u64,
    pub insertions: u64,
    pub evictions: u64,
    pub expirations: u64,
}

impl CacheStats {
    pub fn hit_ratio(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

#[derive(Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    insertions: AtomicU64,
    evictions: AtomicU64,
    expirations: AtomicU64,
}

/// Capacity-bounded query result cache.
///
/// Payloads are opaque to the cache: stored as given, returned by clone.
/// Keys are canonical strings derived from [`QueryShape`], so hits depend on
/// query meaning rather than incidental formatting.
///
/// TTL is enforced twice: lazily on every `get` (correctness) and eagerly by
/// the optional background sweep (peak-memory hygiene). Capacity is enforced
/// on `set` by evicting the entry with the oldest successful read.
pub struct QueryCache<T> {
    config: CacheConfig,
    entries: Arc<RwLock<HashMap<String, CacheEntry<T>>>>,
    counters: Arc<Counters>,
    sweeper: Mutex<Option<Sweeper>>,
}

impl<T: Clone> QueryCache<T> {
    pub fn new(config: CacheConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            entries: Arc::new(RwLock::new(HashMap::new())),
            counters: Arc::new(Counters::default()),
            sweeper: Mutex::new(None),
        })
    }

    /// Look up a cached result for `shape`.
    ///
    /// An entry past its TTL is removed here and reported as a miss,
    /// independent of the background sweep.
    pub fn get(&self, shape: &QueryShape) -> Option<CacheHit<T>> {
        let key = shape.cache_key();
        let mut entries = self.entries.write().unwrap();
        if let Some(entry) = entries.get_mut(key.as_str()) {
            if entry.is_expired(self.config.ttl) {
                entries.remove(key.as_str());
                self.counters.expirations.fetch_add(1, Ordering::Relaxed);
                self.counters.misses.fetch_add(1, Ordering::Relaxed);
                trace!(key = key.as_str(), "cache entry expired on read");
                return None;
            }
            entry.last_accessed = Instant::now();
            entry.access_count += 1;
            self.counters.hits.fetch_add(1, Ordering::Relaxed);
            trace!(
                key = key.as_str(),
                access_count = entry.access_count,
                "cache hit"
            );
            return Some(CacheHit {
                payload: entry.payload.clone(),
                age: entry.created_at.elapsed(),
                access_count: entry.access_count,
            });
        }
        self.counters.misses.fetch_add(1, Ordering::Relaxed);
        trace!(key = key.as_str(), "cache miss");
        None
    }

    /// Insert or fully replace the entry for `shape`.
    ///
    /// At capacity, inserting a new key first evicts exactly one entry: the
    /// one with the globally smallest `last_accessed`. Replacing an existing
    /// key never evicts.
    pub fn set(&self, shape: &QueryShape, payload: T) {
        let key = shape.cache_key();
        let mut entries = self.entries.write().unwrap();
        if !entries.contains_key(key.as_str()) && entries.len() >= self.config.max_entries {
            let victim = entries
                .iter()
                .min_by_key(|(_, e)| e.last_accessed)
                .map(|(k, _)| k.clone());
            if let Some(victim) = victim {
                entries.remove(&victim);
                self.counters.evictions.fetch_add(1, Ordering::Relaxed);
                debug!(key = victim.as_str(), "evicted least recently used entry");
            }
        }
        entries.insert(key.into_string(), CacheEntry::new(payload));
        self.counters.insertions.fetch_add(1, Ordering::Relaxed);
    }

    /// Remove entries whose raw key contains `pattern` (case-insensitive),
    /// or every entry when no pattern is given. Returns the removed count.
    pub fn invalidate(&self, pattern: Option<&str>) -> usize {
        let mut entries = self.entries.write().unwrap();
        let removed = match pattern {
            None => {
                let removed = entries.len();
                entries.clear();
                removed
            }
            Some(p) => {
                let needle = p.to_lowercase();
                let before = entries.len();
                entries.retain(|key, _| !key.to_lowercase().contains(&needle));
                before - entries.len()
            }
        };
        debug!(pattern = pattern.unwrap_or("<all>"), removed, "invalidated cache entries");
        removed
    }

    /// Snapshot of current size and counters.
    pub fn stats(&self) -> CacheStats {
        let entries = self.entries.read().unwrap();
        let size = entries.len();
        let average_access_count = if size == 0 {
            0.0
        } else {
            entries.values().map(|e| e.access_count).sum::<u64>() as f64 / size as f64
        };
        CacheStats {
            size,
            max_entries: self.config.max_entries,
            average_access_count,
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            insertions: self.counters.insertions.load(Ordering::Relaxed),
            evictions: self.counters.evictions.load(Ordering::Relaxed),
            expirations: self.counters.expirations.load(Ordering::Relaxed),
        }
    }

    /// Scan the full table once and drop entries past their TTL.
    ///
    /// Memory reclamation only; `get` enforces TTL regardless.
    pub fn purge_expired(&self) -> usize {
        sweep_table(&self.entries, self.config.ttl, &self.counters)
    }
}

impl<T: Clone + Send + Sync + 'static> QueryCache<T> {
    /// Start the periodic expiry sweep. No-op if one is already running.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start_sweeper(&self) {
        let mut slot = self.sweeper.lock().unwrap();
        if slot.is_some() {
            return;
        }
        let entries = Arc::clone(&self.entries);
        let counters = Arc::clone(&self.counters);
        let ttl = self.config.ttl;
        *slot = Some(Sweeper::spawn(self.config.sweep_interval, move || {
            sweep_table(&entries, ttl, &counters);
        }));
    }

    /// Stop the background sweep, if running, and wait for it to finish.
    pub async fn shutdown(&self) -> Result<()> {
        let sweeper = self.sweeper.lock().unwrap().take();
        match sweeper {
            Some(sweeper) => sweeper.shutdown().await,
            None => Ok(()),
        }
    }
}

fn sweep_table<T>(
    entries: &RwLock<HashMap<String, CacheEntry<T>>>,
    ttl: Duration,
    counters: &Counters,
) -> usize {
    let mut entries = entries.write().unwrap();
    let before = entries.len();
    entries.retain(|_, entry| !entry.is_expired(ttl));
    let removed = before - entries.len();
    if removed > 0 {
        counters
            .expirations
            .fetch_add(removed as u64, Ordering::Relaxed);
        debug!(removed, "swept expired cache entries");
    }
    removed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::key::QueryShape;
    use std::thread::sleep;

    fn cache(max_entries: usize, ttl: Duration) -> QueryCache<String> {
        QueryCache::new(
            CacheConfig::new()
                .with_max_entries(max_entries)
                .with_ttl(ttl),
        )
        .unwrap()
    }

    fn minute() -> Duration {
        Duration::from_secs(60)
    }

    #[test]
    fn miss_then_hit() {
        let cache = cache(10, minute());
        let shape = QueryShape::new("rust borrow checker");

        assert!(cache.get(&shape).is_none());
        cache.set(&shape, "results".to_string());

        let hit = cache.get(&shape).expect("entry should be cached");
        assert_eq!(hit.payload, "results");
        assert_eq!(hit.access_count, 1);

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.size, 1);
    }

    #[test]
    fn equivalent_shapes_share_an_entry() {
        let cache = cache(10, minute());
        cache.set(&QueryShape::new("  Hello World "), "payload".to_string());
        assert!(cache.get(&QueryShape::new("hello world")).is_some());
    }

    #[test]
    fn replacing_an_entry_resets_bookkeeping() {
        let cache = cache(10, minute());
        let shape = QueryShape::new("rust");

        cache.set(&shape, "v1".to_string());
        cache.get(&shape);
        cache.set(&shape, "v2".to_string());

        assert_eq!(cache.stats().average_access_count, 0.0);
        let hit = cache.get(&shape).unwrap();
        assert_eq!(hit.payload, "v2");
        assert_eq!(hit.access_count, 1);
    }

    #[test]
    fn expired_entry_is_removed_on_read() {
        let cache = cache(10, Duration::from_millis(40));
        let shape = QueryShape::new("stale");
        cache.set(&shape, "old".to_string());

        sleep(Duration::from_millis(60));

        assert!(cache.get(&shape).is_none());
        let stats = cache.stats();
        assert_eq!(stats.size, 0);
        assert_eq!(stats.expirations, 1);
    }

    #[test]
    fn least_recently_read_entry_is_evicted() {
        let cache = cache(3, minute());
        let (a, b, c, d) = (
            QueryShape::new("alpha"),
            QueryShape::new("beta"),
            QueryShape::new("gamma"),
            QueryShape::new("delta"),
        );

        // strictly increasing timestamps so the LRU order is unambiguous
        cache.set(&a, "a".to_string());
        sleep(Duration::from_millis(5));
        cache.set(&b, "b".to_string());
        sleep(Duration::from_millis(5));
        cache.set(&c, "c".to_string());
        sleep(Duration::from_millis(5));

        cache.get(&a);
        sleep(Duration::from_millis(5));
        cache.get(&c);
        sleep(Duration::from_millis(5));

        cache.set(&d, "d".to_string());

        assert!(cache.get(&b).is_none(), "beta should have been evicted");
        assert!(cache.get(&a).is_some());
        assert!(cache.get(&c).is_some());
        assert!(cache.get(&d).is_some());
        assert_eq!(cache.stats().evictions, 1);
    }

    #[test]
    fn replacing_at_capacity_does_not_evict() {
        let cache = cache(2, minute());
        let a = QueryShape::new("alpha");
        let b = QueryShape::new("beta");

        cache.set(&a, "a".to_string());
        cache.set(&b, "b".to_string());
        cache.set(&a, "a2".to_string());

        assert_eq!(cache.stats().evictions, 0);
        assert!(cache.get(&a).is_some());
        assert!(cache.get(&b).is_some());
    }

    #[test]
    fn pattern_invalidation_matches_key_substrings() {
        let cache = cache(10, minute());
        cache.set(&QueryShape::new("hello world"), "1".to_string());
        cache.set(&QueryShape::new("hello universe"), "2".to_string());
        cache.set(&QueryShape::new("goodbye world"), "3".to_string());

        assert_eq!(cache.invalidate(Some("HELLO")), 2);
        assert!(cache.get(&QueryShape::new("hello world")).is_none());
        assert!(cache.get(&QueryShape::new("goodbye world")).is_some());

        assert_eq!(cache.invalidate(None), 1);
        assert_eq!(cache.stats().size, 0);
    }

    #[test]
    fn average_access_count_tracks_reads() {
        let cache = cache(10, minute());
        let shape = QueryShape::new("popular");
        cache.set(&shape, "p".to_string());
        for _ in 0..4 {
            cache.get(&shape);
        }
        let stats = cache.stats();
        assert_eq!(stats.size, 1);
        assert_eq!(stats.average_access_count, 4.0);
    }

    #[test]
    fn purge_reclaims_only_expired_entries() {
        let cache = cache(10, Duration::from_millis(30));
        cache.set(&QueryShape::new("one"), "1".to_string());
        cache.set(&QueryShape::new("two"), "2".to_string());

        sleep(Duration::from_millis(50));
        cache.set(&QueryShape::new("three"), "3".to_string());

        assert_eq!(cache.purge_expired(), 2);
        assert_eq!(cache.stats().size, 1);
        assert_eq!(cache.purge_expired(), 0);
    }

    #[test]
    fn zero_capacity_is_a_configuration_error() {
        let result = QueryCache::<String>::new(CacheConfig::new().with_max_entries(0));
        assert!(result.is_err());
    }
}
