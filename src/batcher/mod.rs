//! # Batching Core
//!
//! The scheduler and processor that turn many logical requests into few
//! physical calls.
//!
//! ## Key Components
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`RequestBatcher`] | Public entry point: `enqueue` a request, await its response |
//! | scheduler (`core`) | IDLE/ARMED drain cycle over window timer and size trigger |
//! | processor (`processor`) | Group-by-endpoint dispatch with aggregate demux and fallback |
//!
//! ## Drain cycle
//!
//! The first enqueue after a drain arms a cycle: a timer of `batch_window`
//! starts, and the queue drains when either the timer fires or the queue
//! reaches `max_batch_size` (which cancels the pending timer). A drain in
//! progress never blocks new enqueues; if items remain or arrive during
//! processing, the next cycle re-arms immediately.
//!
//! ## Dispatch
//!
//! Drained items are grouped by endpoint. Batch-capable endpoints receive
//! one aggregate call with per-item correlation ids; on any aggregate
//! shortfall the whole group silently falls back to independent concurrent
//! dispatch, each item wrapped by the retry policy and resolving its own
//! handle as soon as its outcome settles.

mod core;
mod processor;

pub use self::core::RequestBatcher;
