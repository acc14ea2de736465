//! Observability counters and their periodic persistence.

use crate::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

/// Storage key under which stats snapshots are persisted.
pub const STATS_KEY: &str = "batchline:stats";

/// Minimal key-value contract used solely for stats persistence.
/// No transactional guarantees are required.
#[async_trait]
pub trait KvStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;
    async fn set(&self, key: &str, value: String) -> Result<()>;
    fn name(&self) -> &'static str;
}

/// In-memory store, mainly for tests and single-process consumers.
#[derive(Default)]
pub struct MemoryKvStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KvStore for MemoryKvStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.read().unwrap().get(key).cloned())
    }
    async fn set(&self, key: &str, value: String) -> Result<()> {
        self.entries.write().unwrap().insert(key.to_string(), value);
        Ok(())
    }
    fn name(&self) -> &'static str {
        "memory"
    }
}

/// No-op store for consumers that do not want persistence.
pub struct NullKvStore;

#[async_trait]
impl KvStore for NullKvStore {
    async fn get(&self, _key: &str) -> Result<Option<String>> {
        Ok(None)
    }
    async fn set(&self, _key: &str, _value: String) -> Result<()> {
        Ok(())
    }
    fn name(&self) -> &'static str {
        "null"
    }
}

/// Point-in-time view of the collector's counters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub total_requests: u64,
    pub batched_requests: u64,
    pub cache_hits: u64,
    pub deduped_requests: u64,
    pub batches_sent: u64,
    pub errors: u64,
}

impl StatsSnapshot {
    /// Share of logical requests answered without new network work.
    pub fn efficiency(&self) -> f64 {
        if self.total_requests == 0 {
            0.0
        } else {
            (self.cache_hits + self.deduped_requests) as f64 / self.total_requests as f64
        }
    }
}

/// Lock-free counters accumulated across the batching layer.
pub struct StatsCollector {
    total_requests: AtomicU64,
    batched_requests: AtomicU64,
    cache_hits: AtomicU64,
    deduped_requests: AtomicU64,
    batches_sent: AtomicU64,
    errors: AtomicU64,
}

impl StatsCollector {
    pub fn new() -> Self {
        Self {
            total_requests: AtomicU64::new(0),
            batched_requests: AtomicU64::new(0),
            cache_hits: AtomicU64::new(0),
            deduped_requests: AtomicU64::new(0),
            batches_sent: AtomicU64::new(0),
            errors: AtomicU64::new(0),
        }
    }

    pub fn record_request(&self) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
    }
    pub fn record_cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }
    pub fn record_dedup_hit(&self) {
        self.deduped_requests.fetch_add(1, Ordering::Relaxed);
    }
    pub fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Records one drained batch and returns the running batch count, which
    /// the caller uses to decide whether a persistence write is due.
    pub fn record_batch(&self, item_count: usize) -> u64 {
        self.batched_requests
            .fetch_add(item_count as u64, Ordering::Relaxed);
        self.batches_sent.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            total_requests: self.total_requests.load(Ordering::Relaxed),
            batched_requests: self.batched_requests.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            deduped_requests: self.deduped_requests.load(Ordering::Relaxed),
            batches_sent: self.batches_sent.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
        }
    }

    /// Writes the current snapshot to the store. Persistence failures are
    /// logged and swallowed: counters are advisory and must never fail a
    /// request.
    pub async fn persist(&self, store: &dyn KvStore) {
        let snapshot = self.snapshot();
        match serde_json::to_string(&snapshot) {
            Ok(json) => {
                if let Err(err) = store.set(STATS_KEY, json).await {
                    tracing::warn!(store = store.name(), error = %err, "stats persistence failed");
                }
            }
            Err(err) => {
                tracing::warn!(error = %err, "stats snapshot serialization failed");
            }
        }
    }
}

impl Default for StatsCollector {
    fn default() -> Self {
        Self::new()
    }
}
