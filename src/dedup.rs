//! In-flight request deduplication.
//!
//! When several logical requests with the same fingerprint arrive within the
//! dedup window, only the first becomes primary work; every later arrival
//! attaches to the primary's shared result handle and observes the same
//! eventual outcome.

use crate::cache::Fingerprint;
use crate::request::SharedResult;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

struct DedupEntry {
    handle: SharedResult,
    registered_at: Instant,
    generation: u64,
}

/// Transient map from fingerprint to an in-flight result handle.
///
/// Registrations are removed automatically when the window elapses,
/// regardless of whether the underlying work has completed. At most one
/// entry exists per fingerprint at any instant.
pub struct DedupRegistry {
    in_flight: Arc<Mutex<HashMap<Fingerprint, DedupEntry>>>,
    window: Duration,
    generation: AtomicU64,
}

impl DedupRegistry {
    pub fn new(window: Duration) -> Self {
        Self {
            in_flight: Arc::new(Mutex::new(HashMap::new())),
            window,
            generation: AtomicU64::new(0),
        }
    }

    /// Atomically either attaches to an existing fresh registration
    /// (returning its handle) or records `handle` as the new primary
    /// (returning `None`).
    ///
    /// Registration and lookup share one lock, so two "simultaneous"
    /// identical requests cannot both become primary.
    pub async fn register_or_attach(
        &self,
        fingerprint: Fingerprint,
        handle: SharedResult,
    ) -> Option<SharedResult> {
        let mut in_flight = self.in_flight.lock().await;
        if let Some(entry) = in_flight.get(&fingerprint) {
            if entry.registered_at.elapsed() < self.window {
                return Some(entry.handle.clone());
            }
        }

        let generation = self.generation.fetch_add(1, Ordering::Relaxed);
        in_flight.insert(
            fingerprint.clone(),
            DedupEntry {
                handle,
                registered_at: Instant::now(),
                generation,
            },
        );
        drop(in_flight);

        // Scheduled removal after the window, regardless of outcome. The
        // generation guard keeps a stale timer from deleting a newer
        // registration for the same fingerprint.
        let map = Arc::clone(&self.in_flight);
        let window = self.window;
        tokio::spawn(async move {
            tokio::time::sleep(window).await;
            let mut in_flight = map.lock().await;
            if in_flight
                .get(&fingerprint)
                .is_some_and(|e| e.generation == generation)
            {
                in_flight.remove(&fingerprint);
            }
        });
        None
    }

    /// Returns the in-flight handle for a fingerprint, if still within the
    /// window.
    pub async fn lookup(&self, fingerprint: &Fingerprint) -> Option<SharedResult> {
        let in_flight = self.in_flight.lock().await;
        in_flight
            .get(fingerprint)
            .filter(|e| e.registered_at.elapsed() < self.window)
            .map(|e| e.handle.clone())
    }

    /// Number of tracked in-flight registrations (fresh or awaiting sweep).
    pub async fn len(&self) -> usize {
        self.in_flight.lock().await.len()
    }

    pub async fn clear(&self) {
        self.in_flight.lock().await.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::{result_channel, RequestDescriptor};
    use serde_json::json;

    fn fp(n: u32) -> Fingerprint {
        Fingerprint::of(&RequestDescriptor::post("/v1/test", json!({ "n": n })))
    }

    #[tokio::test]
    async fn test_first_registration_is_primary() {
        let registry = DedupRegistry::new(Duration::from_secs(5));
        let (_tx, handle) = result_channel();
        assert!(registry.register_or_attach(fp(1), handle).await.is_none());
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn test_second_registration_attaches() {
        let registry = DedupRegistry::new(Duration::from_secs(5));
        let (tx, primary) = result_channel();
        registry.register_or_attach(fp(1), primary).await;

        let (_tx2, other) = result_channel();
        let attached = registry.register_or_attach(fp(1), other).await;
        assert!(attached.is_some());

        tx.send(Ok(json!("shared"))).unwrap();
        assert_eq!(attached.unwrap().await.unwrap(), json!("shared"));
    }

    #[tokio::test]
    async fn test_distinct_fingerprints_do_not_attach() {
        let registry = DedupRegistry::new(Duration::from_secs(5));
        let (_tx1, h1) = result_channel();
        let (_tx2, h2) = result_channel();
        assert!(registry.register_or_attach(fp(1), h1).await.is_none());
        assert!(registry.register_or_attach(fp(2), h2).await.is_none());
        assert_eq!(registry.len().await, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_registration_expires_after_window() {
        let registry = DedupRegistry::new(Duration::from_millis(100));
        let (_tx, handle) = result_channel();
        registry.register_or_attach(fp(1), handle).await;
        assert!(registry.lookup(&fp(1)).await.is_some());

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert!(registry.lookup(&fp(1)).await.is_none());
        // the sweep task also removed the entry, not just hid it
        assert_eq!(registry.len().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_expiry_ignores_completion_state() {
        let registry = DedupRegistry::new(Duration::from_millis(100));
        let (tx, handle) = result_channel();
        registry.register_or_attach(fp(1), handle).await;
        // resolve immediately; the registration must still expire on time
        tx.send(Ok(json!(1))).unwrap();

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert!(registry.lookup(&fp(1)).await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_reregistration_survives_stale_sweep() {
        let registry = DedupRegistry::new(Duration::from_millis(100));
        let (_tx1, h1) = result_channel();
        registry.register_or_attach(fp(1), h1).await;

        tokio::time::sleep(Duration::from_millis(110)).await;

        let (_tx2, h2) = result_channel();
        assert!(registry.register_or_attach(fp(1), h2).await.is_none());
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(
            registry.lookup(&fp(1)).await.is_some(),
            "fresh registration must outlive the previous generation's sweep"
        );
    }
}
