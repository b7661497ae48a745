//! Bounded in-memory cache with TTL and approximate LRU eviction
//!
//! Used in front of the thread store and the embedding service. Entries are
//! advisory: a miss always falls back to the source of truth.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::RwLock;
use std::time::{Duration, Instant};

#[derive(Clone)]
struct CacheEntry<V> {
    value: V,
    expires_at: Instant,
    last_access: u64,
}

struct Inner<K, V> {
    entries: HashMap<K, CacheEntry<V>>,
    tick: u64,
}

/// Bounded TTL cache
pub struct TtlCache<K, V> {
    inner: RwLock<Inner<K, V>>,
    capacity: usize,
    default_ttl: Duration,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            inner: RwLock::new(Inner {
                entries: HashMap::new(),
                tick: 0,
            }),
            capacity: capacity.max(1),
            default_ttl: ttl,
        }
    }

    /// Get cached value if present and not expired
    pub fn get(&self, key: &K) -> Option<V> {
        let mut inner = self.inner.write().ok()?;
        inner.tick += 1;
        let tick = inner.tick;

        let entry = inner.entries.get_mut(key)?;
        if Instant::now() < entry.expires_at {
            entry.last_access = tick;
            Some(entry.value.clone())
        } else {
            inner.entries.remove(key);
            None
        }
    }

    /// Insert with the default TTL, evicting when over capacity
    pub fn insert(&self, key: K, value: V) {
        self.insert_with_ttl(key, value, self.default_ttl);
    }

    pub fn insert_with_ttl(&self, key: K, value: V, ttl: Duration) {
        let Ok(mut inner) = self.inner.write() else {
            return;
        };
        inner.tick += 1;
        let entry = CacheEntry {
            value,
            expires_at: Instant::now() + ttl,
            last_access: inner.tick,
        };
        inner.entries.insert(key, entry);

        if inner.entries.len() > self.capacity {
            Self::evict(&mut inner, self.capacity);
        }
    }

    /// Drop expired entries first, then the least recently used ones
    fn evict(inner: &mut Inner<K, V>, capacity: usize) {
        let now = Instant::now();
        inner.entries.retain(|_, e| now < e.expires_at);

        let excess = inner.entries.len().saturating_sub(capacity);
        if excess == 0 {
            return;
        }

        let mut by_age: Vec<(u64, K)> = inner
            .entries
            .iter()
            .map(|(k, e)| (e.last_access, k.clone()))
            .collect();
        by_age.sort_by_key(|(tick, _)| *tick);

        for (_, key) in by_age.into_iter().take(excess) {
            inner.entries.remove(&key);
        }
    }

    pub fn remove(&self, key: &K) -> Option<V> {
        self.inner
            .write()
            .ok()
            .and_then(|mut inner| inner.entries.remove(key))
            .map(|e| e.value)
    }

    /// Clear expired entries
    pub fn cleanup(&self) {
        if let Ok(mut inner) = self.inner.write() {
            let now = Instant::now();
            inner.entries.retain(|_, e| now < e.expires_at);
        }
    }

    pub fn len(&self) -> usize {
        self.inner.read().map(|i| i.entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn stats(&self) -> CacheStats {
        if let Ok(inner) = self.inner.read() {
            let now = Instant::now();
            let total = inner.entries.len();
            let expired = inner
                .entries
                .values()
                .filter(|e| now >= e.expires_at)
                .count();

            CacheStats {
                total_entries: total,
                expired_entries: expired,
                active_entries: total - expired,
                capacity: self.capacity,
            }
        } else {
            CacheStats::default()
        }
    }
}

/// Cache statistics
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct CacheStats {
    pub total_entries: usize,
    pub expired_entries: usize,
    pub active_entries: usize,
    pub capacity: usize,
}

/// Cache key for an embedding of `text` under `model`
pub fn embedding_cache_key(model: &str, text: &str) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(model.as_bytes());
    hasher.update(&[0]);
    hasher.update(text.as_bytes());
    format!("embed:{}:{}", model, hasher.finalize().to_hex())
}
