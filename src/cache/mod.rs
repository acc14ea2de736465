//! # Response Caching Module
//!
//! Fingerprint-keyed caching of previously observed responses, bounding both
//! staleness (TTL) and memory (LRU capacity).
//!
//! ## Key Components
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`Fingerprint`] | Deterministic identity key derived from a request |
//! | [`BoundedCache`] | Fixed-capacity TTL + LRU cache of responses |
//! | [`CacheStats`] | Total/active/expired entry counts |
//!
//! ## Semantics
//!
//! - Identity is the SHA-256 of `(method, endpoint, canonical body)`, shared
//!   with the deduplication registry.
//! - Expiry is lazy: a stale entry is dropped when looked up.
//! - Eviction is eager: inserting past capacity removes the single
//!   least-recently-used entry. A `get` refreshes recency without extending
//!   the TTL.

mod key;
mod store;

pub use key::Fingerprint;
pub use store::{BoundedCache, CacheStats};
