//! In-process store with the same accumulate-on-conflict semantics as the
//! PostgreSQL tables, for exercising the scheduler and processor in tests.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, Ordering};

use alloy::primitives::Address;
use async_trait::async_trait;
use parking_lot::Mutex;

use super::{BalanceStore, BlockStore, CompressedBalanceStore, StoreError};
use crate::balance::{BalanceDelta, CompressedBalance, CompressionWindow};
use crate::db::DbError;
use crate::types::{Amount, Asset, BlockData};

#[derive(Debug, Default)]
struct Inner {
    blocks: BTreeMap<u64, BlockData>,
    deltas: BTreeMap<(u64, Address, Asset), Amount>,
    compressed: BTreeMap<(u64, Address, Asset), Amount>,
    windows: BTreeSet<u64>,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
    fail_block_writes: AtomicBool,
    fail_compressed_writes: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every `record_block` call fail until reset.
    pub fn set_fail_block_writes(&self, fail: bool) {
        self.fail_block_writes.store(fail, Ordering::SeqCst);
    }

    /// Make every `record_compressed_balances` call fail until reset.
    pub fn set_fail_compressed_writes(&self, fail: bool) {
        self.fail_compressed_writes.store(fail, Ordering::SeqCst);
    }

    /// Add rows into the compressed table without window bookkeeping.
    pub fn accumulate_compressed(&self, rows: &[CompressedBalance]) {
        let mut inner = self.inner.lock();
        for row in rows {
            *inner
                .compressed
                .entry((row.to_block, row.account, row.asset))
                .or_default() += &row.amount;
        }
    }

    pub fn compressed_amount(&self, account: Address, asset: Asset, to_block: u64) -> Option<Amount> {
        self.inner
            .lock()
            .compressed
            .get(&(to_block, account, asset))
            .cloned()
    }

    pub fn compressed_rows(&self) -> Vec<CompressedBalance> {
        self.inner
            .lock()
            .compressed
            .iter()
            .map(|((to_block, account, asset), amount)| CompressedBalance {
                account: *account,
                asset: *asset,
                to_block: *to_block,
                amount: amount.clone(),
            })
            .collect()
    }

    pub fn delta_amount(&self, account: Address, asset: Asset, block_number: u64) -> Option<Amount> {
        self.inner
            .lock()
            .deltas
            .get(&(block_number, account, asset))
            .cloned()
    }

    pub fn block(&self, number: u64) -> Option<BlockData> {
        self.inner.lock().blocks.get(&number).cloned()
    }

    fn simulated_failure() -> StoreError {
        StoreError::Database(DbError::PoolError(deadpool_postgres::PoolError::Closed))
    }
}

fn accumulate_deltas(inner: &mut Inner, deltas: &[BalanceDelta]) {
    for delta in deltas {
        *inner
            .deltas
            .entry((delta.block_number, delta.account, delta.asset))
            .or_default() += &delta.amount;
    }
}

#[async_trait]
impl BlockStore for MemoryStore {
    async fn record_block(&self, block: &BlockData, deltas: &[BalanceDelta]) -> Result<(), StoreError> {
        if self.fail_block_writes.load(Ordering::SeqCst) {
            return Err(Self::simulated_failure());
        }
        let mut inner = self.inner.lock();
        if inner.blocks.contains_key(&block.number) {
            return Err(StoreError::BlockAlreadyRecorded(block.number));
        }
        inner.blocks.insert(block.number, block.clone());
        accumulate_deltas(&mut inner, deltas);
        Ok(())
    }

    async fn latest_block_number(&self) -> Result<Option<u64>, StoreError> {
        Ok(self.inner.lock().blocks.keys().next_back().copied())
    }

    async fn missing_block_numbers(&self, from: u64, to: u64) -> Result<Vec<u64>, StoreError> {
        let inner = self.inner.lock();
        Ok((from..to).filter(|n| !inner.blocks.contains_key(n)).collect())
    }
}

#[async_trait]
impl BalanceStore for MemoryStore {
    async fn record_block_deltas(&self, deltas: &[BalanceDelta]) -> Result<(), StoreError> {
        accumulate_deltas(&mut self.inner.lock(), deltas);
        Ok(())
    }

    async fn count_blocks_in_range(&self, from: u64, to: u64) -> Result<u64, StoreError> {
        if from >= to {
            return Ok(0);
        }
        Ok(self.inner.lock().blocks.range(from..to).count() as u64)
    }

    async fn deltas_in_range(&self, from: u64, to: u64) -> Result<Vec<BalanceDelta>, StoreError> {
        Ok(self
            .inner
            .lock()
            .deltas
            .iter()
            .filter(|((block_number, _, _), _)| (from..to).contains(block_number))
            .map(|((block_number, account, asset), amount)| BalanceDelta {
                account: *account,
                asset: *asset,
                block_number: *block_number,
                amount: amount.clone(),
            })
            .collect())
    }
}

#[async_trait]
impl CompressedBalanceStore for MemoryStore {
    async fn last_compressed_window_end(&self) -> Result<Option<u64>, StoreError> {
        Ok(self.inner.lock().windows.iter().next_back().copied())
    }

    async fn record_compressed_balances(
        &self,
        window: &CompressionWindow,
        rows: &[CompressedBalance],
    ) -> Result<(), StoreError> {
        if self.fail_compressed_writes.load(Ordering::SeqCst) {
            return Err(Self::simulated_failure());
        }
        {
            let mut inner = self.inner.lock();
            if !inner.windows.insert(window.to_block()) {
                return Err(StoreError::WindowAlreadyCompressed(window.to_block()));
            }
        }
        self.accumulate_compressed(rows);
        Ok(())
    }
}
