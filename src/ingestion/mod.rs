//! Block ingestion.
//!
//! The [`Ingestor`] discovers block numbers and claims them in the
//! [`BlockProcessorQueue`](crate::queue::BlockProcessorQueue); the
//! [`BlockProcessor`] fetches each block, computes its balance deltas,
//! announces it at most once and persists it.

mod ingestor;
mod processor;
mod publisher;
mod source;
#[cfg(test)]
pub mod testing;

pub use ingestor::Ingestor;
pub use processor::{BlockProcessor, ProcessError};
pub use publisher::{BlockPublisher, PgNotifyPublisher, PublishError, PublishedBlock};
pub use source::BlockSource;
