use std::sync::Arc;
#[cfg(feature = "bench")]
use std::time::Instant;

use thiserror::Error;

use super::publisher::{BlockPublisher, PublishError, PublishedBlock};
use super::source::BlockSource;
use crate::balance::{compute_block_deltas, BalanceError};
use crate::queue::{BlockProcessorQueue, QueueError};
use crate::rpc::RpcError;
use crate::store::{BlockStore, StoreError};

#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("RPC error: {0}")]
    Rpc(#[from] RpcError),

    #[error("Block {0} is not available from the chain source yet")]
    BlockNotFound(u64),

    #[error(transparent)]
    Balance(#[from] BalanceError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Publish error: {0}")]
    Publish(#[from] PublishError),

    #[error("Queue error: {0}")]
    Queue(#[from] QueueError),
}

/// Runs one attempt at a block and reports the outcome to the queue.
pub struct BlockProcessor {
    source: Arc<dyn BlockSource>,
    store: Arc<dyn BlockStore>,
    queue: Arc<BlockProcessorQueue>,
    publisher: Option<Arc<dyn BlockPublisher>>,
}

impl BlockProcessor {
    pub fn new(
        source: Arc<dyn BlockSource>,
        store: Arc<dyn BlockStore>,
        queue: Arc<BlockProcessorQueue>,
        publisher: Option<Arc<dyn BlockPublisher>>,
    ) -> Self {
        Self {
            source,
            store,
            queue,
            publisher,
        }
    }

    /// Process a block the caller holds, either from a successful
    /// `enqueue` or from `next`.
    ///
    /// On success the block is released with `done`. On failure it is
    /// released with `set_failed`, which makes it eligible for retry, and the
    /// error is returned.
    pub async fn process(&self, number: u64) -> Result<(), ProcessError> {
        match self.attempt(number).await {
            Ok(()) => {
                self.queue.done(number)?;
                Ok(())
            }
            Err(e) => {
                match &e {
                    ProcessError::Balance(_) => {
                        tracing::error!("Block {} has malformed chain data: {}", number, e)
                    }
                    _ => tracing::warn!("Block {} failed, will retry: {}", number, e),
                }
                if let Err(queue_err) = self.queue.set_failed(number) {
                    tracing::error!("Could not release block {}: {}", number, queue_err);
                }
                Err(e)
            }
        }
    }

    async fn attempt(&self, number: u64) -> Result<(), ProcessError> {
        #[cfg(feature = "bench")]
        let started = Instant::now();

        let block = self
            .source
            .fetch_block(number)
            .await?
            .ok_or(ProcessError::BlockNotFound(number))?;

        #[cfg(feature = "bench")]
        let fetched = Instant::now();

        let deltas = compute_block_deltas(&block)?;

        #[cfg(feature = "bench")]
        let computed = Instant::now();

        if let Some(publisher) = &self.publisher {
            // a retry after a failed write must not announce the block again
            if self.queue.can_publish(number) {
                publisher
                    .publish(&PublishedBlock::new(&block, &deltas))
                    .await?;
                self.queue.set_published(number)?;
            }
        }

        match self.store.record_block(&block, &deltas).await {
            Ok(()) => {}
            Err(StoreError::BlockAlreadyRecorded(_)) => {
                tracing::warn!("Block {} was already recorded, skipping", number);
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        }

        #[cfg(feature = "bench")]
        crate::bench::record(
            number,
            block.transactions.len(),
            deltas.len(),
            crate::bench::BlockTimings {
                fetch: fetched - started,
                compute: computed - fetched,
                write: computed.elapsed(),
            },
        );

        tracing::debug!(
            "Indexed block {} ({} transactions, {} balance deltas)",
            number,
            block.transactions.len(),
            deltas.len()
        );
        Ok(())
    }
}
