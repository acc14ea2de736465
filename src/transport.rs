//! Transport boundary: the generic HTTP-like call the batching layer sits
//! in front of.

use crate::request::Response;
use crate::{Error, Result};
use async_trait::async_trait;
use std::time::Duration;

/// Endpoint patterns that support a native multi-item variant. A trailing
/// `*` makes the pattern a prefix match.
pub const DEFAULT_BATCH_ENDPOINTS: &[&str] = &["/v1/embeddings", "/v1/batch/*"];

/// Physical dispatch of one request body to one endpoint.
///
/// Implementations must surface an HTTP status code on failure so the retry
/// policy can classify it as transient or terminal.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(
        &self,
        endpoint: &str,
        method: &str,
        body: &serde_json::Value,
        timeout: Duration,
    ) -> Result<Response>;

    /// Whether the endpoint accepts multiple logical requests in one
    /// physical call.
    fn supports_batch(&self, _endpoint: &str) -> bool {
        false
    }

    fn name(&self) -> &'static str {
        "transport"
    }
}

pub(crate) fn matches_pattern(pattern: &str, endpoint: &str) -> bool {
    match pattern.strip_suffix('*') {
        Some(prefix) => endpoint.starts_with(prefix),
        None => endpoint == pattern,
    }
}

/// reqwest-backed transport with bearer auth and a configurable batch
/// endpoint allow-list.
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    batch_endpoints: Vec<String>,
}

impl HttpTransport {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .pool_max_idle_per_host(32)
            .pool_idle_timeout(Some(Duration::from_secs(90)))
            .build()
            .map_err(|e| Error::Transport {
                status: 0,
                message: e.to_string(),
            })?;
        Ok(Self {
            client,
            base_url: base_url.into(),
            api_key: None,
            batch_endpoints: DEFAULT_BATCH_ENDPOINTS
                .iter()
                .map(|s| s.to_string())
                .collect(),
        })
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn with_batch_endpoints(mut self, patterns: Vec<String>) -> Self {
        self.batch_endpoints = patterns;
        self
    }

    fn classify(err: reqwest::Error) -> Error {
        // No HTTP status to report for connect/timeout failures; map them to
        // the transient statuses the retry policy understands.
        let status = if err.is_timeout() {
            408
        } else if err.is_connect() {
            503
        } else {
            0
        };
        Error::Transport {
            status,
            message: err.to_string(),
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(
        &self,
        endpoint: &str,
        method: &str,
        body: &serde_json::Value,
        timeout: Duration,
    ) -> Result<Response> {
        let url = format!("{}{}", self.base_url, endpoint);
        let mut req = match method.to_uppercase().as_str() {
            "POST" => self.client.post(&url).json(body),
            "PUT" => self.client.put(&url).json(body),
            "DELETE" => self.client.delete(&url),
            _ => self.client.get(&url),
        };

        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }

        let response = req.timeout(timeout).send().await.map_err(Self::classify)?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(Error::Transport {
                status: status.as_u16(),
                message,
            });
        }

        response.json().await.map_err(Self::classify)
    }

    fn supports_batch(&self, endpoint: &str) -> bool {
        self.batch_endpoints
            .iter()
            .any(|p| matches_pattern(p, endpoint))
    }

    fn name(&self) -> &'static str {
        "http"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_pattern() {
        assert!(matches_pattern("/v1/embeddings", "/v1/embeddings"));
        assert!(!matches_pattern("/v1/embeddings", "/v1/embeddings/x"));
    }

    #[test]
    fn test_prefix_pattern() {
        assert!(matches_pattern("/v1/batch/*", "/v1/batch/completions"));
        assert!(matches_pattern("/v1/batch/*", "/v1/batch/"));
        assert!(!matches_pattern("/v1/batch/*", "/v1/chat"));
    }

    #[test]
    fn test_http_transport_allow_list() {
        let transport = HttpTransport::new("http://localhost:9999")
            .unwrap()
            .with_batch_endpoints(vec!["/v1/embeddings".into()]);
        assert!(transport.supports_batch("/v1/embeddings"));
        assert!(!transport.supports_batch("/v1/chat/completions"));
    }
}
