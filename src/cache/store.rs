//! Bounded TTL + LRU response cache.

use super::key::Fingerprint;
use crate::request::Response;
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::Mutex;
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
struct CacheEntry {
    value: Response,
    expires_at: Instant,
}

impl CacheEntry {
    fn new(value: Response, ttl: Duration) -> Self {
        Self {
            value,
            expires_at: Instant::now() + ttl,
        }
    }

    fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

/// Counts reported by [`BoundedCache::stats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub total: usize,
    pub active: usize,
    pub expired: usize,
}

/// Fixed-capacity cache mapping a request fingerprint to a previously
/// observed response.
///
/// Entries expire lazily at lookup time; capacity overflow evicts the
/// least-recently-used entry eagerly on insert. A `get` refreshes recency
/// for LRU ordering but never extends the TTL.
pub struct BoundedCache {
    entries: Mutex<LruCache<Fingerprint, CacheEntry>>,
}

impl BoundedCache {
    pub fn new(max_size: usize) -> Self {
        let cap = NonZeroUsize::new(max_size.max(1)).unwrap();
        Self {
            entries: Mutex::new(LruCache::new(cap)),
        }
    }

    /// Returns the cached response if present and fresh, removing the entry
    /// if it has expired.
    pub fn get(&self, fingerprint: &Fingerprint) -> Option<Response> {
        let mut entries = self.entries.lock().unwrap();
        let expired = matches!(entries.peek(fingerprint), Some(e) if e.is_expired());
        if expired {
            entries.pop(fingerprint);
            return None;
        }
        entries.get(fingerprint).map(|e| e.value.clone())
    }

    /// Inserts or overwrites an entry. At capacity, the least-recently-used
    /// entry is evicted first.
    pub fn set(&self, fingerprint: Fingerprint, value: Response, ttl: Duration) {
        let mut entries = self.entries.lock().unwrap();
        entries.put(fingerprint, CacheEntry::new(value, ttl));
    }

    pub fn clear(&self) {
        self.entries.lock().unwrap().clear();
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        let entries = self.entries.lock().unwrap();
        let total = entries.len();
        let expired = entries.iter().filter(|(_, e)| e.is_expired()).count();
        CacheStats {
            total,
            active: total - expired,
            expired,
        }
    }
}
