//! Drain-cycle processing: grouping, aggregate dispatch, and per-item
//! fallback.

use super::core::BatcherInner;
use crate::queue::QueueItem;
use crate::request::Response;
use crate::{Error, Result};
use serde_json::json;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, warn};
use uuid::Uuid;

impl BatcherInner {
    /// One drain cycle: dequeue up to `max_batch_size` items, group them by
    /// endpoint, and dispatch each group.
    pub(crate) async fn process_batch(&self) {
        let items = self
            .queue
            .lock()
            .unwrap()
            .dequeue_all(self.config.max_batch_size);
        if items.is_empty() {
            return;
        }
        let count = items.len();
        debug!(count, "draining batch");

        // Group by endpoint, preserving drain order both across groups and
        // within each group.
        let mut groups: Vec<(String, Vec<QueueItem>)> = Vec::new();
        for item in items {
            match groups
                .iter_mut()
                .find(|(endpoint, _)| *endpoint == item.descriptor.endpoint)
            {
                Some((_, group)) => group.push(item),
                None => groups.push((item.descriptor.endpoint.clone(), vec![item])),
            }
        }

        futures::future::join_all(
            groups
                .into_iter()
                .map(|(endpoint, group)| self.process_group(endpoint, group)),
        )
        .await;

        let batches = self.stats.record_batch(count);
        if batches % self.config.persist_interval == 0 {
            self.stats.persist(self.store.as_ref()).await;
        }
    }

    async fn process_group(&self, endpoint: String, group: Vec<QueueItem>) {
        if self.transport.supports_batch(&endpoint) {
            match self.dispatch_aggregate(&endpoint, &group).await {
                Ok(results) => {
                    self.resolve_group(group, results);
                    return;
                }
                // Aggregate failures are never surfaced to callers; the
                // group falls back to independent per-item dispatch.
                Err(err) => {
                    warn!(%endpoint, error = %err, "aggregate dispatch failed, falling back");
                }
            }
        }

        // Independent concurrent dispatch. Each item resolves its own
        // handle as soon as its outcome is known; a slow or failing sibling
        // never blocks the others.
        futures::future::join_all(group.into_iter().map(|item| self.dispatch_item(item))).await;
    }

    /// Builds one aggregate request tagged with per-item correlation ids,
    /// dispatches it once, and demultiplexes the results back into
    /// submission order.
    ///
    /// Any shortfall (transport error, malformed aggregate response, missing
    /// correlation id) is reported as [`Error::BatchEndpoint`] with the
    /// group left intact for the fallback path.
    async fn dispatch_aggregate(
        &self,
        endpoint: &str,
        group: &[QueueItem],
    ) -> Result<Vec<Response>> {
        let ids: Vec<String> = group.iter().map(|_| Uuid::new_v4().to_string()).collect();
        let requests: Vec<serde_json::Value> = group
            .iter()
            .zip(&ids)
            .map(|(item, id)| json!({ "id": id, "body": item.descriptor.body }))
            .collect();
        let body = json!({ "requests": requests });

        let timeout = group
            .iter()
            .map(|item| item.options.timeout)
            .max()
            .unwrap_or(Duration::from_secs(30));

        debug!(endpoint, items = group.len(), "dispatching aggregate request");
        let response = self
            .transport
            .send(endpoint, "POST", &body, timeout)
            .await
            .map_err(|e| Error::BatchEndpoint(e.to_string()))?;

        let results = response
            .get("results")
            .and_then(|v| v.as_array())
            .ok_or_else(|| Error::BatchEndpoint("missing results array".into()))?;

        let mut by_id: HashMap<&str, Response> = HashMap::with_capacity(results.len());
        for entry in results {
            let id = entry
                .get("id")
                .and_then(|v| v.as_str())
                .ok_or_else(|| Error::BatchEndpoint("result entry without id".into()))?;
            let value = entry
                .get("response")
                .cloned()
                .ok_or_else(|| Error::BatchEndpoint("result entry without response".into()))?;
            by_id.insert(id, value);
        }

        ids.iter()
            .map(|id| {
                by_id
                    .remove(id.as_str())
                    .ok_or_else(|| Error::BatchEndpoint(format!("missing correlation id {id}")))
            })
            .collect()
    }

    fn resolve_group(&self, group: Vec<QueueItem>, results: Vec<Response>) {
        for (item, value) in group.into_iter().zip(results) {
            if item.options.cacheable {
                self.cache
                    .set(item.fingerprint.clone(), value.clone(), self.config.cache_ttl);
            }
            item.complete(Ok(value));
        }
    }

    async fn dispatch_item(&self, item: QueueItem) {
        let result = self
            .retry
            .execute(|_attempt| {
                self.transport.send(
                    &item.descriptor.endpoint,
                    &item.descriptor.method,
                    &item.descriptor.body,
                    item.options.timeout,
                )
            })
            .await;

        match result {
            Ok(value) => {
                if item.options.cacheable {
                    self.cache
                        .set(item.fingerprint.clone(), value.clone(), self.config.cache_ttl);
                }
                item.complete(Ok(value));
            }
            Err(err) => {
                self.stats.record_error();
                item.complete(Err(err));
            }
        }
    }
}
