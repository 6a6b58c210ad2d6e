use std::sync::Arc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use super::compressor::compress_window;
use super::types::CompressionWindow;
use crate::store::{BalanceStore, CompressedBalanceStore, StoreError};

/// Result of a single scheduler pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// The window was complete and its rows were committed.
    Compressed { window: CompressionWindow, rows: usize },
    /// Fewer than `window.size` blocks of the window are stored yet.
    Incomplete { window: CompressionWindow, available: u64 },
}

/// Periodically folds fully ingested windows of per-block deltas into
/// compressed rows.
///
/// The next window is always derived from the last committed one, so a failed
/// pass is simply attempted again on the following tick. Only one pass runs at
/// a time per scheduler.
pub struct CompressionScheduler<S> {
    store: Arc<S>,
    size: u64,
    interval: Duration,
}

impl<S> CompressionScheduler<S>
where
    S: BalanceStore + CompressedBalanceStore,
{
    pub fn new(store: Arc<S>, size: u64, interval: Duration) -> Self {
        Self {
            store,
            size,
            interval,
        }
    }

    pub async fn run(&self, cancel: CancellationToken) -> Result<(), StoreError> {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!(
            "Compression scheduler started (window size {}, every {:?})",
            self.size,
            self.interval
        );

        loop {
            tokio::select! {
                biased;

                _ = cancel.cancelled() => {
                    tracing::info!("Compression scheduler shutting down");
                    return Ok(());
                }

                _ = ticker.tick() => {
                    match self.tick().await {
                        Ok(TickOutcome::Compressed { window, rows }) => {
                            tracing::info!(
                                "Compressed blocks {}-{} into {} rows",
                                window.from_block,
                                window.to_block(),
                                rows
                            );
                            // more complete windows may already be waiting
                            ticker.reset_immediately();
                        }
                        Ok(TickOutcome::Incomplete { window, available }) => {
                            tracing::debug!(
                                "Window {}-{} has {}/{} blocks, waiting",
                                window.from_block,
                                window.to_block(),
                                available,
                                window.size
                            );
                        }
                        Err(StoreError::WindowAlreadyCompressed(to_block)) => {
                            tracing::warn!(
                                "Window ending at block {} was compressed concurrently, skipping",
                                to_block
                            );
                        }
                        Err(e) => {
                            tracing::error!("Compression pass failed, retrying next tick: {}", e);
                        }
                    }
                }
            }
        }
    }

    /// Compress the next window if every block in it has been stored.
    pub async fn tick(&self) -> Result<TickOutcome, StoreError> {
        let last = self.store.last_compressed_window_end().await?;
        let window = CompressionWindow::after(last, self.size);

        let available = self
            .store
            .count_blocks_in_range(window.from_block, window.end())
            .await?;
        if available < window.size {
            return Ok(TickOutcome::Incomplete { window, available });
        }

        let deltas = self
            .store
            .deltas_in_range(window.from_block, window.end())
            .await?;
        let compressed = compress_window(&window, &deltas);

        self.store
            .record_compressed_balances(&window, &compressed)
            .await?;

        Ok(TickOutcome::Compressed {
            window,
            rows: compressed.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::balance::BalanceDelta;
    use crate::store::memory::MemoryStore;
    use crate::store::BlockStore;
    use crate::types::{Amount, Asset, BlockData};
    use alloy::primitives::{Address, B256};

    const ALICE: Address = Address::repeat_byte(0xa1);

    fn block(number: u64) -> BlockData {
        BlockData {
            number,
            hash: B256::with_last_byte(number as u8),
            parent_hash: B256::ZERO,
            timestamp: 1_700_000_000 + number,
            miner: Address::ZERO,
            gas_used: 0,
            gas_limit: 30_000_000,
            transactions: Vec::new(),
        }
    }

    fn alice_native(block_number: u64, amount: i64) -> BalanceDelta {
        BalanceDelta {
            account: ALICE,
            asset: Asset::Native,
            block_number,
            amount: Amount::from(amount),
        }
    }

    async fn store_with_window_ending_at(to_block: u64, size: u64) -> Arc<MemoryStore> {
        let store = Arc::new(MemoryStore::new());
        store
            .record_compressed_balances(&CompressionWindow::new(to_block + 1 - size, size), &[])
            .await
            .unwrap();
        store
    }

    fn scheduler(store: &Arc<MemoryStore>, size: u64) -> CompressionScheduler<MemoryStore> {
        CompressionScheduler::new(store.clone(), size, Duration::from_millis(10))
    }

    #[tokio::test]
    async fn test_waits_for_full_window_then_compresses() {
        let store = store_with_window_ending_at(9, 2).await;
        let scheduler = scheduler(&store, 2);

        store.record_block(&block(10), &[alice_native(10, 5)]).await.unwrap();
        assert_eq!(store.count_blocks_in_range(10, 12).await.unwrap(), 1);
        assert_eq!(
            scheduler.tick().await.unwrap(),
            TickOutcome::Incomplete {
                window: CompressionWindow::new(10, 2),
                available: 1,
            }
        );
        assert!(store.compressed_amount(ALICE, Asset::Native, 11).is_none());

        store.record_block(&block(11), &[alice_native(11, 5)]).await.unwrap();
        assert_eq!(store.count_blocks_in_range(10, 12).await.unwrap(), 2);
        assert_eq!(
            scheduler.tick().await.unwrap(),
            TickOutcome::Compressed {
                window: CompressionWindow::new(10, 2),
                rows: 1,
            }
        );
        assert_eq!(
            store.compressed_amount(ALICE, Asset::Native, 11),
            Some(Amount::from(10u64))
        );
        assert_eq!(store.last_compressed_window_end().await.unwrap(), Some(11));
    }

    #[tokio::test]
    async fn test_first_window_starts_at_genesis() {
        let store = Arc::new(MemoryStore::new());
        let scheduler = scheduler(&store, 3);

        for n in 0..3 {
            store.record_block(&block(n), &[alice_native(n, 1)]).await.unwrap();
        }

        assert_eq!(
            scheduler.tick().await.unwrap(),
            TickOutcome::Compressed {
                window: CompressionWindow::new(0, 3),
                rows: 1,
            }
        );
        assert_eq!(
            store.compressed_amount(ALICE, Asset::Native, 2),
            Some(Amount::from(3u64))
        );
    }

    #[tokio::test]
    async fn test_empty_blocks_still_advance_the_window() {
        let store = Arc::new(MemoryStore::new());
        let scheduler = scheduler(&store, 2);
        store.record_block(&block(0), &[]).await.unwrap();
        store.record_block(&block(1), &[]).await.unwrap();

        assert_eq!(
            scheduler.tick().await.unwrap(),
            TickOutcome::Compressed {
                window: CompressionWindow::new(0, 2),
                rows: 0,
            }
        );
        assert_eq!(
            scheduler.tick().await.unwrap(),
            TickOutcome::Incomplete {
                window: CompressionWindow::new(2, 2),
                available: 0,
            }
        );
    }

    #[tokio::test]
    async fn test_deltas_alone_do_not_fill_a_window() {
        let store = Arc::new(MemoryStore::new());
        let scheduler = scheduler(&store, 2);
        store
            .record_block_deltas(&[alice_native(0, 1), alice_native(1, 1)])
            .await
            .unwrap();

        assert_eq!(
            scheduler.tick().await.unwrap(),
            TickOutcome::Incomplete {
                window: CompressionWindow::new(0, 2),
                available: 0,
            }
        );

        store.record_block(&block(0), &[]).await.unwrap();
        store.record_block(&block(1), &[]).await.unwrap();
        scheduler.tick().await.unwrap();
        assert_eq!(
            store.compressed_amount(ALICE, Asset::Native, 1),
            Some(Amount::from(2u64))
        );
    }

    #[tokio::test]
    async fn test_each_window_is_compressed_at_most_once() {
        let store = store_with_window_ending_at(9, 2).await;
        let scheduler = scheduler(&store, 2);
        store.record_block(&block(10), &[alice_native(10, 5)]).await.unwrap();
        store.record_block(&block(11), &[alice_native(11, 5)]).await.unwrap();

        scheduler.tick().await.unwrap();
        // the next pass moves on instead of re-applying blocks 10-11
        assert!(matches!(
            scheduler.tick().await.unwrap(),
            TickOutcome::Incomplete { window, .. } if window.from_block == 12
        ));

        // a stale writer replaying the same window is rejected wholesale
        let window = CompressionWindow::new(10, 2);
        let deltas = store.deltas_in_range(10, 12).await.unwrap();
        let replay = compress_window(&window, &deltas);
        let err = store
            .record_compressed_balances(&window, &replay)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::WindowAlreadyCompressed(11)));
        assert_eq!(
            store.compressed_amount(ALICE, Asset::Native, 11),
            Some(Amount::from(10u64))
        );
    }

    #[tokio::test]
    async fn test_reapplying_compression_without_window_guard_doubles_total() {
        let store = Arc::new(MemoryStore::new());
        let window = CompressionWindow::new(10, 2);
        let deltas = vec![alice_native(10, 5), alice_native(11, 5)];

        store.accumulate_compressed(&compress_window(&window, &deltas));
        store.accumulate_compressed(&compress_window(&window, &deltas));

        assert_eq!(
            store.compressed_amount(ALICE, Asset::Native, 11),
            Some(Amount::from(20u64))
        );
    }

    #[tokio::test]
    async fn test_failed_write_is_retried_on_next_tick() {
        let store = Arc::new(MemoryStore::new());
        let scheduler = scheduler(&store, 1);
        store.record_block(&block(0), &[alice_native(0, 7)]).await.unwrap();

        store.set_fail_compressed_writes(true);
        assert!(matches!(scheduler.tick().await, Err(StoreError::Database(_))));
        assert_eq!(store.last_compressed_window_end().await.unwrap(), None);
        assert!(store.compressed_rows().is_empty());

        store.set_fail_compressed_writes(false);
        assert_eq!(
            scheduler.tick().await.unwrap(),
            TickOutcome::Compressed {
                window: CompressionWindow::new(0, 1),
                rows: 1,
            }
        );
        assert_eq!(
            store.compressed_amount(ALICE, Asset::Native, 0),
            Some(Amount::from(7u64))
        );
    }

    #[tokio::test]
    async fn test_run_compresses_backlog_and_stops_on_cancel() {
        let store = Arc::new(MemoryStore::new());
        for n in 0..6 {
            store.record_block(&block(n), &[alice_native(n, 1)]).await.unwrap();
        }

        let cancel = CancellationToken::new();
        let handle = {
            let scheduler = scheduler(&store, 2);
            let cancel = cancel.clone();
            tokio::spawn(async move { scheduler.run(cancel).await })
        };

        for _ in 0..200 {
            if store.last_compressed_window_end().await.unwrap() == Some(5) {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        cancel.cancel();
        handle.await.unwrap().unwrap();

        assert_eq!(store.last_compressed_window_end().await.unwrap(), Some(5));
        for to_block in [1, 3, 5] {
            assert_eq!(
                store.compressed_amount(ALICE, Asset::Native, to_block),
                Some(Amount::from(2u64))
            );
        }
    }
}
