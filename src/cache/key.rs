//! Request fingerprinting.

use crate::request::RequestDescriptor;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Deterministic identity key for a request, used for both caching and
/// deduplication.
///
/// Two structurally equal descriptors always yield the same fingerprint;
/// collisions across distinct descriptors are ruled out at the strength of
/// SHA-256 over a canonical encoding.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Computes the fingerprint of a descriptor.
    ///
    /// `serde_json::Value` keeps object keys in a sorted map, so
    /// `to_string` is a canonical encoding: key insertion order in the
    /// caller does not leak into the hash.
    pub fn of(descriptor: &RequestDescriptor) -> Self {
        let body = descriptor.body.to_string();
        let mut hasher = Sha256::new();
        hasher.update(descriptor.method.as_bytes());
        hasher.update(b"\n");
        hasher.update(descriptor.endpoint.as_bytes());
        hasher.update(b"\n");
        hasher.update(body.as_bytes());
        let hash: String = hasher
            .finalize()
            .iter()
            .map(|b| format!("{:02x}", b))
            .collect();
        Self(hash)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
