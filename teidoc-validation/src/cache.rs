//! Revision-keyed validation cache
//!
//! Entries are keyed by `(passage, revision)` and expire two ways: the
//! least recently used entry is evicted when a new key arrives at capacity,
//! and entries older than the TTL are dropped when read or swept by
//! [`ValidationCache::cleanup`].
//!
//! Eviction only bounds memory. Whether a result still applies to a
//! document is decided by comparing revision and lineage, see
//! [`ValidationSnapshot::is_stale`](crate::ValidationSnapshot::is_stale).

use crate::clock::{Clock, SystemClock};
use crate::error::CacheError;
use crate::result::ValidationResult;
use lru::LruCache;
use parking_lot::Mutex;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use teidoc_core::CacheConfig;
use teidoc_types::{PassageId, Revision};

/// Cache key: one passage at one revision
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub passage_id: PassageId,
    pub revision: Revision,
}

impl CacheKey {
    pub fn new(passage_id: PassageId, revision: Revision) -> Self {
        Self {
            passage_id,
            revision,
        }
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", self.passage_id, self.revision)
    }
}

#[derive(Debug, Clone)]
struct CacheEntry<V> {
    results: V,
    inserted_at: Instant,
}

/// Statistics about cache usage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheStats {
    pub size: usize,
    pub max_size: usize,
    pub ttl: Duration,
    pub hits: u64,
    pub misses: u64,
}

impl CacheStats {
    /// Get cache hit rate (0.0 to 1.0)
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

impl std::fmt::Display for CacheStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Validation Cache:")?;
        writeln!(
            f,
            "  Hits: {} | Misses: {} | Hit Rate: {:.1}%",
            self.hits,
            self.misses,
            self.hit_rate() * 100.0
        )?;
        writeln!(f, "  Entries: {} / {}", self.size, self.max_size)?;
        writeln!(f, "  TTL: {}s", self.ttl.as_secs())?;
        Ok(())
    }
}

/// Bounded LRU + TTL cache of validation results
///
/// Every method takes the internal lock once, so each call is atomic with
/// respect to other callers.
pub struct ValidationCache<V = ValidationResult> {
    entries: Mutex<LruCache<CacheKey, CacheEntry<V>>>,
    max_size: NonZeroUsize,
    ttl: Duration,
    clock: Arc<dyn Clock>,

    hits: AtomicU64,
    misses: AtomicU64,
}

impl<V: Clone> ValidationCache<V> {
    /// Create a cache holding at most `max_size` entries for `ttl` each
    pub fn new(max_size: usize, ttl: Duration) -> Result<Self, CacheError> {
        Self::with_clock(max_size, ttl, Arc::new(SystemClock))
    }

    pub fn with_clock(
        max_size: usize,
        ttl: Duration,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, CacheError> {
        let max_size = NonZeroUsize::new(max_size).ok_or(CacheError::ZeroCapacity)?;
        Ok(Self {
            entries: Mutex::new(LruCache::new(max_size)),
            max_size,
            ttl,
            clock,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        })
    }

    pub fn from_config(config: &CacheConfig) -> Result<Self, CacheError> {
        Self::new(config.max_size, config.ttl())
    }

    /// Look up `key`, refreshing its recency on a hit
    ///
    /// An entry past its TTL is removed and reported as a miss.
    pub fn get(&self, key: &CacheKey) -> Option<V> {
        let now = self.clock.now();
        let mut entries = self.entries.lock();

        let expired = match entries.peek(key) {
            Some(entry) => self.is_expired(entry, now),
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                return None;
            }
        };

        if expired {
            entries.pop(key);
            self.misses.fetch_add(1, Ordering::Relaxed);
            tracing::debug!("Validation cache entry {} expired", key);
            return None;
        }

        self.hits.fetch_add(1, Ordering::Relaxed);
        entries.get(key).map(|entry| entry.results.clone())
    }

    /// Store `results` under `key`, evicting the least recently used entry
    /// if a new key arrives at capacity
    ///
    /// Overwriting an existing key restarts its TTL but keeps its recency;
    /// only `get` marks an entry as recently used.
    pub fn set(&self, key: CacheKey, results: V) {
        let entry = CacheEntry {
            results,
            inserted_at: self.clock.now(),
        };

        let mut entries = self.entries.lock();
        if let Some(existing) = entries.peek_mut(&key) {
            *existing = entry;
            return;
        }
        if let Some((evicted, _)) = entries.push(key, entry) {
            tracing::debug!("Validation cache evicted {}", evicted);
        }
    }

    /// Presence check; ignores TTL and leaves recency untouched
    pub fn has(&self, key: &CacheKey) -> bool {
        self.entries.lock().contains(key)
    }

    /// Drop every cached revision of `passage_id`; returns how many were removed
    pub fn invalidate_passage(&self, passage_id: &PassageId) -> usize {
        self.remove_where(|key, _| &key.passage_id == passage_id)
    }

    /// Drop every passage's entry at `revision`; returns how many were removed
    pub fn invalidate_revision(&self, revision: Revision) -> usize {
        self.remove_where(|key, _| key.revision == revision)
    }

    /// Sweep all expired entries; returns how many were removed
    pub fn cleanup(&self) -> usize {
        let now = self.clock.now();
        let removed = self.remove_where(|_, entry| self.is_expired(entry, now));
        if removed > 0 {
            tracing::debug!("Validation cache cleanup removed {} entries", removed);
        }
        removed
    }

    /// Remove all entries and reset the counters
    pub fn clear(&self) {
        self.entries.lock().clear();
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            size: self.len(),
            max_size: self.max_size.get(),
            ttl: self.ttl,
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }

    fn is_expired(&self, entry: &CacheEntry<V>, now: Instant) -> bool {
        now.saturating_duration_since(entry.inserted_at) > self.ttl
    }

    fn remove_where(&self, predicate: impl Fn(&CacheKey, &CacheEntry<V>) -> bool) -> usize {
        let mut entries = self.entries.lock();
        let doomed: Vec<CacheKey> = entries
            .iter()
            .filter(|(key, entry)| predicate(*key, *entry))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &doomed {
            entries.pop(key);
        }
        doomed.len()
    }
}

impl<V> std::fmt::Debug for ValidationCache<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValidationCache")
            .field("max_size", &self.max_size)
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    const TTL: Duration = Duration::from_secs(300);

    fn key(passage: &str, revision: u64) -> CacheKey {
        CacheKey::new(PassageId::new(passage), Revision(revision))
    }

    fn manual_cache(max_size: usize) -> (ValidationCache<&'static str>, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new());
        let cache = ValidationCache::with_clock(max_size, TTL, clock.clone()).unwrap();
        (cache, clock)
    }

    #[test]
    fn test_capacity_evicts_oldest() {
        let (cache, _) = manual_cache(2);
        cache.set(key("p1", 0), "one");
        cache.set(key("p2", 0), "two");
        cache.set(key("p3", 0), "three");

        assert!(!cache.has(&key("p1", 0)));
        assert!(cache.has(&key("p2", 0)));
        assert!(cache.has(&key("p3", 0)));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_get_refreshes_recency() {
        let (cache, _) = manual_cache(2);
        cache.set(key("p1", 0), "one");
        cache.set(key("p2", 0), "two");

        assert_eq!(cache.get(&key("p1", 0)), Some("one"));
        cache.set(key("p3", 0), "three");

        assert!(cache.has(&key("p1", 0)));
        assert!(!cache.has(&key("p2", 0)));
    }

    #[test]
    fn test_overwrite_existing_key_does_not_evict() {
        let (cache, _) = manual_cache(2);
        cache.set(key("p1", 0), "one");
        cache.set(key("p2", 0), "two");
        cache.set(key("p1", 0), "uno");

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get(&key("p1", 0)), Some("uno"));
        assert!(cache.has(&key("p2", 0)));
    }

    #[test]
    fn test_overwrite_keeps_recency() {
        let (cache, _) = manual_cache(2);
        cache.set(key("p1", 0), "one");
        cache.set(key("p2", 0), "two");
        cache.set(key("p1", 0), "uno");
        cache.set(key("p3", 0), "three");

        assert!(!cache.has(&key("p1", 0)));
        assert!(cache.has(&key("p2", 0)));
        assert!(cache.has(&key("p3", 0)));
    }

    #[test]
    fn test_overwrite_restarts_ttl() {
        let (cache, clock) = manual_cache(2);
        cache.set(key("p1", 0), "one");
        clock.advance(Duration::from_secs(200));
        cache.set(key("p1", 0), "uno");
        clock.advance(Duration::from_secs(200));

        assert_eq!(cache.get(&key("p1", 0)), Some("uno"));
    }

    #[test]
    fn test_ttl_expiry() {
        let (cache, clock) = manual_cache(10);
        let k = key("p1", 3);
        cache.set(k.clone(), "ok");

        clock.advance(TTL);
        assert_eq!(cache.get(&k), Some("ok"));

        clock.advance(Duration::from_secs(1));
        assert!(cache.has(&k));
        assert_eq!(cache.get(&k), None);
        assert!(!cache.has(&k));
    }

    #[test]
    fn test_cleanup_sweeps_expired() {
        let (cache, clock) = manual_cache(10);
        cache.set(key("p1", 0), "old");
        clock.advance(Duration::from_secs(200));
        cache.set(key("p2", 0), "new");
        clock.advance(Duration::from_secs(200));

        assert_eq!(cache.cleanup(), 1);
        assert!(!cache.has(&key("p1", 0)));
        assert!(cache.has(&key("p2", 0)));
    }

    #[test]
    fn test_invalidation() {
        let (cache, _) = manual_cache(10);
        cache.set(key("p1", 0), "a");
        cache.set(key("p1", 1), "b");
        cache.set(key("p2", 1), "c");

        assert_eq!(cache.invalidate_passage(&PassageId::new("p1")), 2);
        assert_eq!(cache.len(), 1);

        cache.set(key("p3", 1), "d");
        assert_eq!(cache.invalidate_revision(Revision(1)), 2);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_stats() {
        let (cache, _) = manual_cache(4);
        cache.set(key("p1", 0), "a");
        cache.get(&key("p1", 0));
        cache.get(&key("p9", 0));

        let stats = cache.stats();
        assert_eq!(stats.size, 1);
        assert_eq!(stats.max_size, 4);
        assert_eq!(stats.ttl, TTL);
        assert_eq!((stats.hits, stats.misses), (1, 1));
        assert!((stats.hit_rate() - 0.5).abs() < f64::EPSILON);
        assert!(stats.to_string().contains("Entries: 1 / 4"));

        cache.clear();
        assert_eq!(cache.stats().hits, 0);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let result = ValidationCache::<ValidationResult>::new(0, TTL);
        assert!(matches!(result, Err(CacheError::ZeroCapacity)));
    }

    #[test]
    fn test_from_config_defaults() {
        let cache = ValidationCache::<ValidationResult>::from_config(&CacheConfig::default()).unwrap();
        let stats = cache.stats();
        assert_eq!(stats.max_size, 100);
        assert_eq!(stats.ttl, Duration::from_secs(300));
    }
}
