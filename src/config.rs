//! Batcher configuration.

use std::time::Duration;

/// Configuration for the batching layer.
///
/// All knobs have conservative defaults tuned for sub-second batching in
/// front of a remote completion/embedding API.
#[derive(Debug, Clone)]
pub struct BatcherConfig {
    /// Maximum time a request waits before a batch is forced.
    pub batch_window: Duration,
    /// Maximum items drained per cycle; reaching it triggers an immediate
    /// drain, cancelling the pending window timer.
    pub max_batch_size: usize,
    /// Lifetime of a dedup registration, regardless of completion state.
    pub dedup_window: Duration,
    /// Default TTL for cache entries.
    pub cache_ttl: Duration,
    /// LRU capacity of the response cache.
    pub max_cache_size: usize,
    /// Retry ceiling, counting the first attempt.
    pub max_retry_attempts: u32,
    /// Base delay for exponential backoff.
    pub retry_base_delay: Duration,
    /// Backoff ceiling.
    pub retry_max_delay: Duration,
    /// Maximum queued items before `enqueue` sheds load with an
    /// overloaded error.
    pub max_queue_depth: usize,
    /// Persist stats to the key-value store every N batches.
    pub persist_interval: u64,
}

impl Default for BatcherConfig {
    fn default() -> Self {
        Self {
            batch_window: Duration::from_millis(100),
            max_batch_size: 10,
            dedup_window: Duration::from_secs(5),
            cache_ttl: Duration::from_secs(30),
            max_cache_size: 100,
            max_retry_attempts: 3,
            retry_base_delay: Duration::from_millis(1000),
            retry_max_delay: Duration::from_secs(300),
            max_queue_depth: 10_000,
            persist_interval: 10,
        }
    }
}

impl BatcherConfig {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn with_batch_window(mut self, window: Duration) -> Self {
        self.batch_window = window;
        self
    }
    pub fn with_max_batch_size(mut self, size: usize) -> Self {
        self.max_batch_size = size.max(1);
        self
    }
    pub fn with_dedup_window(mut self, window: Duration) -> Self {
        self.dedup_window = window;
        self
    }
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }
    pub fn with_max_cache_size(mut self, size: usize) -> Self {
        self.max_cache_size = size.max(1);
        self
    }
    pub fn with_max_retry_attempts(mut self, attempts: u32) -> Self {
        self.max_retry_attempts = attempts.max(1);
        self
    }
    pub fn with_retry_delays(mut self, base: Duration, max: Duration) -> Self {
        self.retry_base_delay = base;
        self.retry_max_delay = max;
        self
    }
    pub fn with_max_queue_depth(mut self, depth: usize) -> Self {
        self.max_queue_depth = depth.max(1);
        self
    }
    pub fn with_persist_interval(mut self, batches: u64) -> Self {
        self.persist_interval = batches.max(1);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = BatcherConfig::default();
        assert_eq!(config.batch_window, Duration::from_millis(100));
        assert_eq!(config.max_batch_size, 10);
        assert_eq!(config.dedup_window, Duration::from_secs(5));
        assert_eq!(config.cache_ttl, Duration::from_secs(30));
        assert_eq!(config.max_cache_size, 100);
        assert_eq!(config.max_retry_attempts, 3);
        assert_eq!(config.retry_base_delay, Duration::from_millis(1000));
        assert_eq!(config.retry_max_delay, Duration::from_secs(300));
        assert_eq!(config.persist_interval, 10);
    }

    #[test]
    fn test_config_builder() {
        let config = BatcherConfig::new()
            .with_batch_window(Duration::from_millis(50))
            .with_max_batch_size(5)
            .with_max_queue_depth(100);
        assert_eq!(config.batch_window, Duration::from_millis(50));
        assert_eq!(config.max_batch_size, 5);
        assert_eq!(config.max_queue_depth, 100);
    }

    #[test]
    fn test_config_builder_floors() {
        let config = BatcherConfig::new()
            .with_max_batch_size(0)
            .with_max_retry_attempts(0)
            .with_persist_interval(0);
        assert_eq!(config.max_batch_size, 1);
        assert_eq!(config.max_retry_attempts, 1);
        assert_eq!(config.persist_interval, 1);
    }
}
