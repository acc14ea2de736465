//! Three-level priority queue of not-yet-dispatched work items.

use crate::cache::Fingerprint;
use crate::request::{Priority, RequestDescriptor, RequestOptions, Response};
use crate::Result;
use std::collections::VecDeque;
use std::time::Instant;
use tokio::sync::oneshot;

/// One queued unit of work. Owned exclusively by the queue until dequeued;
/// ownership transfers to the batch processor on drain.
#[derive(Debug)]
pub struct QueueItem {
    pub descriptor: RequestDescriptor,
    pub options: RequestOptions,
    pub fingerprint: Fingerprint,
    pub enqueued_at: Instant,
    tx: oneshot::Sender<Result<Response>>,
}

impl QueueItem {
    pub fn new(
        descriptor: RequestDescriptor,
        options: RequestOptions,
        fingerprint: Fingerprint,
        tx: oneshot::Sender<Result<Response>>,
    ) -> Self {
        Self {
            descriptor,
            options,
            fingerprint,
            enqueued_at: Instant::now(),
            tx,
        }
    }

    /// Resolves the item's result handle. A send failure means the caller
    /// already stopped waiting (timeout); the outcome is simply discarded.
    pub fn complete(self, result: Result<Response>) {
        let _ = self.tx.send(result);
    }
}

/// FIFO-within-level queue drained in strict HIGH → NORMAL → LOW order.
pub struct PriorityQueue {
    high: VecDeque<QueueItem>,
    normal: VecDeque<QueueItem>,
    low: VecDeque<QueueItem>,
}

impl PriorityQueue {
    pub fn new() -> Self {
        Self {
            high: VecDeque::new(),
            normal: VecDeque::new(),
            low: VecDeque::new(),
        }
    }

    /// O(1) append to the sub-queue for the item's priority level.
    pub fn enqueue(&mut self, item: QueueItem) {
        match item.options.priority {
            Priority::High => self.high.push_back(item),
            Priority::Normal => self.normal.push_back(item),
            Priority::Low => self.low.push_back(item),
        }
    }

    /// Drains up to `max_items` across levels, higher levels first, each
    /// level FIFO. Uncollected items stay queued in their original relative
    /// order for the next drain.
    pub fn dequeue_all(&mut self, max_items: usize) -> Vec<QueueItem> {
        let mut drained = Vec::with_capacity(max_items.min(self.len()));
        for level in [&mut self.high, &mut self.normal, &mut self.low] {
            while drained.len() < max_items {
                match level.pop_front() {
                    Some(item) => drained.push(item),
                    None => break,
                }
            }
        }
        drained
    }

    pub fn len(&self) -> usize {
        self.high.len() + self.normal.len() + self.low.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for PriorityQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn item(n: u32, priority: Priority) -> QueueItem {
        let descriptor = RequestDescriptor::post("/v1/test", json!({ "n": n }));
        let fingerprint = Fingerprint::of(&descriptor);
        let options = RequestOptions::default().with_priority(priority);
        let (tx, _rx) = oneshot::channel();
        QueueItem::new(descriptor, options, fingerprint, tx)
    }

    fn n_of(item: &QueueItem) -> u64 {
        item.descriptor.body["n"].as_u64().unwrap()
    }

    #[test]
    fn test_queue_level_ordering() {
        let mut q = PriorityQueue::new();
        q.enqueue(item(1, Priority::Low));
        q.enqueue(item(2, Priority::Normal));
        q.enqueue(item(3, Priority::High));
        let drained = q.dequeue_all(10);
        let order: Vec<u64> = drained.iter().map(n_of).collect();
        assert_eq!(order, vec![3, 2, 1]);
        assert!(q.is_empty());
    }

    #[test]
    fn test_queue_fifo_within_level() {
        let mut q = PriorityQueue::new();
        for n in 1..=4 {
            q.enqueue(item(n, Priority::Normal));
        }
        let order: Vec<u64> = q.dequeue_all(10).iter().map(n_of).collect();
        assert_eq!(order, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_queue_capped_drain_keeps_remainder_ordered() {
        let mut q = PriorityQueue::new();
        q.enqueue(item(1, Priority::Normal));
        q.enqueue(item(2, Priority::High));
        q.enqueue(item(3, Priority::Normal));
        q.enqueue(item(4, Priority::High));

        let first: Vec<u64> = q.dequeue_all(3).iter().map(n_of).collect();
        assert_eq!(first, vec![2, 4, 1]);
        assert_eq!(q.len(), 1);

        let second: Vec<u64> = q.dequeue_all(3).iter().map(n_of).collect();
        assert_eq!(second, vec![3]);
    }

    #[test]
    fn test_queue_empty_drain() {
        let mut q = PriorityQueue::new();
        assert!(q.dequeue_all(5).is_empty());
        assert_eq!(q.len(), 0);
    }
}
