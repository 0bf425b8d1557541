//! Flat-search result caching.
//!
//! Free-text code search is the hottest fetch path of a selector dialog
//! (every keystroke can trigger one). Results are cached in an LRU with
//! TTL expiration, keyed by the normalized query, so retyping or
//! backspacing over a query does not re-hit the terminology server.

use std::num::NonZeroUsize;
use std::time::{Duration, Instant};

use cohort_terms::text;
use cohort_terms::{NodeDto, SystemId};
use lru::LruCache;
use parking_lot::Mutex;

use crate::config::SearchCacheConfig;

/// A cached search result with expiration tracking.
#[derive(Debug, Clone)]
struct CacheEntry {
    result: Vec<NodeDto>,
    created_at: Instant,
}

impl CacheEntry {
    fn new(result: Vec<NodeDto>) -> Self {
        Self {
            result,
            created_at: Instant::now(),
        }
    }

    fn is_expired(&self, ttl: Duration) -> bool {
        self.created_at.elapsed() > ttl
    }
}

/// LRU cache with TTL expiration for flat search results.
///
/// On a hit the entry is promoted to most-recently-used; expired entries
/// are dropped lazily on access.
pub struct SearchCache {
    inner: Mutex<LruCache<String, CacheEntry>>,
    ttl: Duration,
}

impl SearchCache {
    /// Creates a cache from its configuration.
    pub fn new(config: &SearchCacheConfig) -> Self {
        let capacity = NonZeroUsize::new(config.max_entries.max(1)).unwrap();
        Self {
            inner: Mutex::new(LruCache::new(capacity)),
            ttl: config.ttl,
        }
    }

    /// The cache key of a query: system name plus the normalized query, so
    /// `"Diabète"` and `"  diabete "` share an entry and systems never
    /// collide.
    pub fn key(system: SystemId, query: &str) -> String {
        format!("{}|{}", system, text::normalize(query))
    }

    /// Gets a cached result, `None` when absent or expired.
    pub fn get(&self, key: &str) -> Option<Vec<NodeDto>> {
        let mut cache = self.inner.lock();
        if let Some(entry) = cache.get(key) {
            if entry.is_expired(self.ttl) {
                cache.pop(key);
                return None;
            }
            return Some(entry.result.clone());
        }
        None
    }

    /// Stores a result, evicting the least recently used entry when full.
    pub fn set(&self, key: String, result: Vec<NodeDto>) {
        self.inner.lock().put(key, CacheEntry::new(result));
    }

    /// Number of entries currently held (expired ones included until they
    /// are touched).
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    /// Whether the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops every entry.
    pub fn clear(&self) {
        self.inner.lock().clear();
    }

    /// Returns cache statistics.
    pub fn stats(&self) -> SearchCacheStats {
        let cache = self.inner.lock();
        let total = cache.len();
        let expired = cache
            .iter()
            .filter(|(_, entry)| entry.is_expired(self.ttl))
            .count();
        SearchCacheStats {
            total_entries: total,
            expired_entries: expired,
            valid_entries: total.saturating_sub(expired),
        }
    }
}

impl std::fmt::Debug for SearchCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let stats = self.stats();
        f.debug_struct("SearchCache")
            .field("entries", &stats.total_entries)
            .field("ttl", &self.ttl)
            .finish()
    }
}

/// Statistics about the search-cache state.
#[derive(Debug, Clone, Default)]
pub struct SearchCacheStats {
    /// Total number of entries in the cache.
    pub total_entries: usize,
    /// Number of expired entries not yet dropped.
    pub expired_entries: usize,
    /// Number of valid entries.
    pub valid_entries: usize,
}
