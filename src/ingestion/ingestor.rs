use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use super::processor::BlockProcessor;
use super::source::BlockSource;
use crate::queue::{BlockProcessorQueue, QueueError};
use crate::store::{BlockStore, StoreError};
use crate::types::config::queue::QueueConfig;

/// Feeds block numbers to the processor: new ones from the chain head and
/// failed ones back out of the queue.
///
/// At most `worker_count` blocks are processed at once across both loops.
pub struct Ingestor {
    processor: Arc<BlockProcessor>,
    source: Arc<dyn BlockSource>,
    store: Arc<dyn BlockStore>,
    queue: Arc<BlockProcessorQueue>,
    workers: Arc<Semaphore>,
    worker_count: usize,
    start_block: u64,
    head_poll_interval: Duration,
    retry_interval: Duration,
}

impl Ingestor {
    pub fn new(
        processor: Arc<BlockProcessor>,
        source: Arc<dyn BlockSource>,
        store: Arc<dyn BlockStore>,
        queue: Arc<BlockProcessorQueue>,
        config: &QueueConfig,
        start_block: u64,
    ) -> Self {
        Self {
            processor,
            source,
            store,
            queue,
            workers: Arc::new(Semaphore::new(config.worker_count)),
            worker_count: config.worker_count,
            start_block,
            head_poll_interval: config.head_poll_interval(),
            retry_interval: config.retry_interval(),
        }
    }

    /// Follow the chain head, handing every newly seen block to a worker.
    ///
    /// Resumes after the highest stored block, or at `start_block` on an
    /// empty database. Blocks below that point that were never stored are
    /// handed to the retry loop first.
    pub async fn run_head_follower(&self, cancel: CancellationToken) -> Result<(), StoreError> {
        let mut next = match self.store.latest_block_number().await? {
            Some(latest) => {
                self.requeue_gaps(latest).await?;
                (latest + 1).max(self.start_block)
            }
            None => self.start_block,
        };
        tracing::info!("Following chain head from block {}", next);

        let mut ticker = tokio::time::interval(self.head_poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;

                _ = cancel.cancelled() => break,

                _ = ticker.tick() => {
                    let head = match self.source.latest_block_number().await {
                        Ok(head) => head,
                        Err(e) => {
                            tracing::warn!("Failed to fetch chain head: {}", e);
                            continue;
                        }
                    };

                    if next <= head {
                        tracing::debug!("New blocks {}-{}", next, head);
                    }

                    while next <= head {
                        // a number seen before is already held or waiting in the queue
                        if self.queue.enqueue(next) && !self.dispatch(next, &cancel).await {
                            break;
                        }
                        next += 1;
                    }
                }
            }
        }

        self.drain().await;
        tracing::info!("Head follower stopped at block {}", next);
        Ok(())
    }

    /// Periodically claim failed blocks oldest-first and process them again.
    pub async fn run_retry_loop(&self, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(self.retry_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;

                _ = cancel.cancelled() => break,

                _ = ticker.tick() => {
                    let mut claimed = 0usize;
                    loop {
                        match self.queue.next() {
                            Ok(number) => {
                                if !self.dispatch(number, &cancel).await {
                                    break;
                                }
                                claimed += 1;
                            }
                            Err(QueueError::Empty) => break,
                            Err(e) => {
                                tracing::warn!("Retry queue error: {}", e);
                                break;
                            }
                        }
                    }

                    if claimed > 0 {
                        let stats = self.queue.stats();
                        tracing::info!(
                            "Retrying {} blocks ({} tracked, {} in flight)",
                            claimed,
                            stats.tracked,
                            stats.processing
                        );
                    }
                }
            }
        }

        self.drain().await;
        tracing::info!("Retry loop stopped");
    }

    /// Queue every unstored block in `[start_block, latest]` for retry.
    ///
    /// Retry state does not survive a restart, so a block that failed in an
    /// earlier run would otherwise never be attempted again and its
    /// compression window would never fill.
    pub async fn requeue_gaps(&self, latest: u64) -> Result<Vec<u64>, StoreError> {
        let missing = self
            .store
            .missing_block_numbers(self.start_block, latest.saturating_add(1))
            .await?;

        for &number in &missing {
            // a fresh entry only becomes claimable by `next` once it has failed
            if self.queue.enqueue(number) {
                if let Err(e) = self.queue.set_failed(number) {
                    tracing::error!("Could not queue missing block {}: {}", number, e);
                }
            }
        }

        if !missing.is_empty() {
            tracing::warn!(
                "{} blocks below stored head {} are missing, queued for retry",
                missing.len(),
                latest
            );
        }
        Ok(missing)
    }

    /// Process a held block on a worker. Returns `false` if shutdown began
    /// before a worker became free, in which case the block is released.
    async fn dispatch(&self, number: u64, cancel: &CancellationToken) -> bool {
        let permit = tokio::select! {
            biased;

            _ = cancel.cancelled() => None,
            permit = self.workers.clone().acquire_owned() => permit.ok(),
        };

        let Some(permit) = permit else {
            if let Err(e) = self.queue.set_failed(number) {
                tracing::error!("Could not release block {}: {}", number, e);
            }
            return false;
        };

        self.spawn(number, permit);
        true
    }

    fn spawn(&self, number: u64, permit: OwnedSemaphorePermit) {
        let processor = self.processor.clone();
        tokio::spawn(async move {
            let _permit = permit;
            // failures are logged and queued for retry by the processor
            let _ = processor.process(number).await;
        });
    }

    /// Wait for in-flight blocks to finish.
    async fn drain(&self) {
        let _ = self.workers.acquire_many(self.worker_count as u32).await;
    }
}
