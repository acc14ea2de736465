//! Request descriptors, options, and result handles.

use crate::{Error, Result};
use futures::future::{BoxFuture, Shared};
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::oneshot;

/// Opaque response payload. This layer never interprets it semantically.
pub type Response = serde_json::Value;

/// Scheduling priority for a queued request.
///
/// Within a level, strict arrival order is preserved. Across levels there is
/// no starvation correction: a continuous stream of `High` items can starve
/// `Low` indefinitely. That is an accepted trade-off, not a bug.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Priority {
    High,
    #[default]
    Normal,
    Low,
}

/// Immutable description of one logical request: the payload to send and
/// the material for fingerprinting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestDescriptor {
    pub endpoint: String,
    pub method: String,
    pub body: serde_json::Value,
}

impl RequestDescriptor {
    pub fn new(
        endpoint: impl Into<String>,
        method: impl Into<String>,
        body: serde_json::Value,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            method: method.into(),
            body,
        }
    }

    /// Shorthand for the common POST case.
    pub fn post(endpoint: impl Into<String>, body: serde_json::Value) -> Self {
        Self::new(endpoint, "POST", body)
    }
}

/// Per-request knobs controlling caching, dedup, priority, and deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestOptions {
    pub priority: Priority,
    pub cacheable: bool,
    pub deduplicate: bool,
    pub timeout: Duration,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            priority: Priority::Normal,
            cacheable: true,
            deduplicate: true,
            timeout: Duration::from_secs(30),
        }
    }
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }
    pub fn with_cacheable(mut self, cacheable: bool) -> Self {
        self.cacheable = cacheable;
        self
    }
    pub fn with_deduplicate(mut self, deduplicate: bool) -> Self {
        self.deduplicate = deduplicate;
        self
    }
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Cloneable handle to one item's eventual result.
///
/// Deduplicated followers clone the primary's handle and all observe the
/// same resolution. A dropped sender surfaces as [`Error::ResultDropped`].
pub type SharedResult = Shared<BoxFuture<'static, Result<Response>>>;

/// Creates a result channel pair: the sender goes into the queue item, the
/// shared receiver is returned to the caller (and the dedup registry).
pub fn result_channel() -> (oneshot::Sender<Result<Response>>, SharedResult) {
    let (tx, rx) = oneshot::channel();
    let shared = rx
        .map(|r| r.unwrap_or(Err(Error::ResultDropped)))
        .boxed()
        .shared();
    (tx, shared)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_options_defaults() {
        let opts = RequestOptions::default();
        assert_eq!(opts.priority, Priority::Normal);
        assert!(opts.cacheable);
        assert!(opts.deduplicate);
        assert_eq!(opts.timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_descriptor_post_shorthand() {
        let d = RequestDescriptor::post("/v1/chat", serde_json::json!({"q": 1}));
        assert_eq!(d.method, "POST");
        assert_eq!(d.endpoint, "/v1/chat");
    }

    #[tokio::test]
    async fn test_result_channel_resolves_all_clones() {
        let (tx, shared) = result_channel();
        let follower = shared.clone();
        tx.send(Ok(serde_json::json!("done"))).unwrap();
        assert_eq!(shared.await.unwrap(), serde_json::json!("done"));
        assert_eq!(follower.await.unwrap(), serde_json::json!("done"));
    }

    #[tokio::test]
    async fn test_result_channel_dropped_sender() {
        let (tx, shared) = result_channel();
        drop(tx);
        assert_eq!(shared.await.unwrap_err(), Error::ResultDropped);
    }
}
