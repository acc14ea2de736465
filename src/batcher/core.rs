//! Public entry point and drain scheduling.

use crate::cache::{BoundedCache, CacheStats, Fingerprint};
use crate::config::BatcherConfig;
use crate::dedup::DedupRegistry;
use crate::queue::{PriorityQueue, QueueItem};
use crate::request::{result_channel, RequestDescriptor, RequestOptions, Response, SharedResult};
use crate::retry::RetryPolicy;
use crate::stats::{KvStore, NullKvStore, StatsCollector, StatsSnapshot};
use crate::transport::Transport;
use crate::{Error, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

pub(crate) struct BatcherInner {
    pub(crate) config: BatcherConfig,
    pub(crate) queue: Mutex<PriorityQueue>,
    pub(crate) cache: BoundedCache,
    pub(crate) dedup: DedupRegistry,
    pub(crate) retry: RetryPolicy,
    pub(crate) stats: StatsCollector,
    pub(crate) transport: Arc<dyn Transport>,
    pub(crate) store: Arc<dyn KvStore>,
    armed: AtomicBool,
    flush: Notify,
}

/// Batching, deduplication, and caching layer in front of a [`Transport`].
///
/// One instance per consumer; all shared state is owned by the instance, not
/// by module globals. Cloning is cheap and shares the same underlying state.
#[derive(Clone)]
pub struct RequestBatcher {
    inner: Arc<BatcherInner>,
}

impl RequestBatcher {
    pub fn new(config: BatcherConfig, transport: Arc<dyn Transport>) -> Self {
        Self::with_store(config, transport, Arc::new(NullKvStore))
    }

    /// Like [`RequestBatcher::new`], with a key-value store that receives a
    /// stats snapshot every `persist_interval` batches.
    pub fn with_store(
        config: BatcherConfig,
        transport: Arc<dyn Transport>,
        store: Arc<dyn KvStore>,
    ) -> Self {
        let inner = BatcherInner {
            queue: Mutex::new(PriorityQueue::new()),
            cache: BoundedCache::new(config.max_cache_size),
            dedup: DedupRegistry::new(config.dedup_window),
            retry: RetryPolicy::from_config(&config),
            stats: StatsCollector::new(),
            transport,
            store,
            armed: AtomicBool::new(false),
            flush: Notify::new(),
            config,
        };
        Self {
            inner: Arc::new(inner),
        }
    }

    /// Submits one logical request and resolves with its response.
    ///
    /// Fast paths are consulted first: a fresh cache entry resolves
    /// immediately, and an in-flight identical request is joined instead of
    /// duplicated. Otherwise the request is queued and dispatched with the
    /// next batch. The caller may suspend only on the returned future; the
    /// producer is never blocked waiting for a batch to fire.
    ///
    /// When `options.timeout` elapses first, the call fails with
    /// [`Error::Timeout`], but the dispatch already in flight is not
    /// cancelled: it still completes in the background and still populates
    /// the cache. Callers that retry after a timeout may therefore hit the
    /// cache on the next attempt.
    pub async fn enqueue(
        &self,
        descriptor: RequestDescriptor,
        options: RequestOptions,
    ) -> Result<Response> {
        let inner = &self.inner;
        inner.stats.record_request();
        let fingerprint = Fingerprint::of(&descriptor);

        if options.cacheable {
            if let Some(hit) = inner.cache.get(&fingerprint) {
                inner.stats.record_cache_hit();
                tracing::debug!(fingerprint = %fingerprint, "cache hit");
                return Ok(hit);
            }
        }

        // Load shedding happens before dedup registration and queuing so a
        // rejected request leaves no trace. The depth check is advisory:
        // concurrent enqueues may briefly overshoot by a few items.
        {
            let queue = inner.queue.lock().unwrap();
            let depth = queue.len();
            if depth >= inner.config.max_queue_depth {
                return Err(Error::Overloaded {
                    depth,
                    limit: inner.config.max_queue_depth,
                });
            }
        }

        let (tx, shared) = result_channel();

        if options.deduplicate {
            if let Some(existing) = inner
                .dedup
                .register_or_attach(fingerprint.clone(), shared.clone())
                .await
            {
                inner.stats.record_dedup_hit();
                tracing::debug!(fingerprint = %fingerprint, "joined in-flight request");
                return Self::await_result(existing, options.timeout).await;
            }
        }

        inner
            .queue
            .lock()
            .unwrap()
            .enqueue(QueueItem::new(descriptor, options, fingerprint, tx));
        Arc::clone(inner).arm();

        Self::await_result(shared, options.timeout).await
    }

    async fn await_result(handle: SharedResult, timeout: Duration) -> Result<Response> {
        match tokio::time::timeout(timeout, handle).await {
            Ok(result) => result,
            Err(_) => Err(Error::Timeout {
                timeout_ms: timeout.as_millis() as u64,
            }),
        }
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.inner.stats.snapshot()
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.inner.cache.stats()
    }

    pub fn clear_cache(&self) {
        self.inner.cache.clear();
    }

    pub fn queue_len(&self) -> usize {
        self.inner.queue.lock().unwrap().len()
    }

    pub async fn in_flight(&self) -> usize {
        self.inner.dedup.len().await
    }
}

impl BatcherInner {
    /// IDLE → ARMED transition. The first enqueue after a drain spawns one
    /// cycle task; reaching the size trigger converts the pending window
    /// wait into an immediate drain.
    fn arm(self: Arc<Self>) {
        if self.queue.lock().unwrap().len() >= self.config.max_batch_size {
            self.flush.notify_one();
        }
        if !self.armed.swap(true, Ordering::SeqCst) {
            tokio::spawn(async move { self.run_cycles().await });
        }
    }

    async fn run_cycles(&self) {
        loop {
            if self.queue.lock().unwrap().len() < self.config.max_batch_size {
                tokio::select! {
                    _ = tokio::time::sleep(self.config.batch_window) => {}
                    _ = self.flush.notified() => {}
                }
            } else {
                // Draining without waiting: consume any stored size-trigger
                // permit so it cannot force an early drain of a later cycle.
                use futures::FutureExt;
                self.flush.notified().now_or_never();
            }

            self.process_batch().await;

            // Leftover items (capped drain, or arrivals during processing)
            // re-arm immediately.
            if !self.queue.lock().unwrap().is_empty() {
                continue;
            }
            self.armed.store(false, Ordering::SeqCst);
            if self.queue.lock().unwrap().is_empty() {
                break;
            }
            // An enqueue slipped in between the emptiness check and the
            // disarm. Reclaim the armed flag unless that enqueue already
            // spawned the next cycle.
            if self.armed.swap(true, Ordering::SeqCst) {
                break;
            }
        }
    }
}
