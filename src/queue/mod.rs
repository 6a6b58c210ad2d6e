//! Retry-safe scheduling for block ingestion.
//!
//! Workers consult the [`BlockProcessorQueue`] before touching a block:
//! freshly observed numbers are claimed with `enqueue`, outcomes are reported
//! with `set_failed`/`done`, and abandoned numbers are resurrected oldest-first
//! through `next`.

mod error;
mod processor_queue;

pub use error::QueueError;
pub use processor_queue::{BlockProcessorQueue, BlockTask, QueueStats};
