//! # batchline
//!
//! Request batching, deduplication, and adaptive caching for high-frequency
//! API clients.
//!
//! This library sits between an automation client that repeatedly calls a
//! remote completion/embedding/search API and that API's transport. It
//! reduces the number of physical network calls per unit time while
//! preserving correctness of the response delivered to each logical caller:
//! no stale entry is ever served past its TTL, and no caller ever receives
//! another request's response.
//!
//! ## How a request flows
//!
//! 1. `enqueue` fingerprints the request and consults the fast paths: a
//!    fresh cache entry resolves immediately; an identical in-flight request
//!    is joined instead of duplicated.
//! 2. On miss, the item joins a three-level priority queue and the batch
//!    scheduler arms a sub-second window.
//! 3. When the window elapses (or the queue hits the size trigger), the
//!    processor drains a batch, groups items by endpoint, and dispatches:
//!    one aggregate call for batch-capable endpoints, otherwise concurrent
//!    per-item calls protected by exponential-backoff retry.
//! 4. Results populate the cache and resolve every waiting caller; counters
//!    are persisted periodically through a key-value store.
//!
//! ## Module Organization
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`batcher`] | Public entry point, drain scheduling, batch dispatch |
//! | [`cache`] | Fingerprinting and the bounded TTL + LRU response cache |
//! | [`queue`] | Three-level FIFO-within-level priority queue |
//! | [`dedup`] | In-flight request deduplication registry |
//! | [`retry`] | Transient-failure classification and backoff |
//! | [`stats`] | Counters, efficiency, and key-value persistence |
//! | [`transport`] | The HTTP-like boundary this layer sits in front of |
//! | [`config`] | Typed configuration with defaults |
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use batchline::{BatcherConfig, HttpTransport, RequestBatcher, RequestDescriptor, RequestOptions};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> batchline::Result<()> {
//!     let transport = Arc::new(HttpTransport::new("https://api.example.com")?);
//!     let batcher = RequestBatcher::new(BatcherConfig::default(), transport);
//!
//!     let descriptor = RequestDescriptor::post(
//!         "/v1/chat/completions",
//!         serde_json::json!({ "model": "m1", "prompt": "hello" }),
//!     );
//!     let response = batcher.enqueue(descriptor, RequestOptions::default()).await?;
//!     println!("{response}");
//!     Ok(())
//! }
//! ```

pub mod batcher;
pub mod cache;
pub mod config;
pub mod dedup;
pub mod error;
pub mod queue;
pub mod request;
pub mod retry;
pub mod stats;
pub mod transport;

/// Result type alias for the library.
pub type Result<T> = std::result::Result<T, Error>;

// Re-export main types for convenience
pub use batcher::RequestBatcher;
pub use cache::{BoundedCache, CacheStats, Fingerprint};
pub use config::BatcherConfig;
pub use error::Error;
pub use request::{Priority, RequestDescriptor, RequestOptions, Response};
pub use retry::RetryPolicy;
pub use stats::{KvStore, MemoryKvStore, NullKvStore, StatsCollector, StatsSnapshot};
pub use transport::{HttpTransport, Transport};
