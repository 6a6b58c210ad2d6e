//! Persistence boundaries for blocks and balances.
//!
//! Writes of balance rows add into any existing row with the same key instead
//! of overwriting it, so the stored amount is the sum of everything applied.
//! Each method that takes a batch applies it all-or-nothing.

mod error;
#[cfg(test)]
pub mod memory;
mod postgres;

pub use error::StoreError;
pub use postgres::PgStore;

use async_trait::async_trait;

use crate::balance::{BalanceDelta, CompressedBalance, CompressionWindow};
use crate::types::BlockData;

#[async_trait]
pub trait BlockStore: Send + Sync {
    /// Persist the block, its transactions and events, and its balance deltas
    /// as one unit.
    async fn record_block(&self, block: &BlockData, deltas: &[BalanceDelta]) -> Result<(), StoreError>;

    /// Highest block number persisted so far.
    async fn latest_block_number(&self) -> Result<Option<u64>, StoreError>;

    /// Block numbers in `[from, to)` with no stored block, ascending.
    async fn missing_block_numbers(&self, from: u64, to: u64) -> Result<Vec<u64>, StoreError>;
}

#[async_trait]
pub trait BalanceStore: Send + Sync {
    /// Accumulate per-block deltas keyed by (account, asset, block_number).
    async fn record_block_deltas(&self, deltas: &[BalanceDelta]) -> Result<(), StoreError>;

    /// Distinct persisted block numbers in `[from, to)`.
    async fn count_blocks_in_range(&self, from: u64, to: u64) -> Result<u64, StoreError>;

    /// All delta rows with a block number in `[from, to)`.
    async fn deltas_in_range(&self, from: u64, to: u64) -> Result<Vec<BalanceDelta>, StoreError>;
}

#[async_trait]
pub trait CompressedBalanceStore: Send + Sync {
    /// Inclusive end of the most recently compressed window.
    async fn last_compressed_window_end(&self) -> Result<Option<u64>, StoreError>;

    /// Record `window` as compressed and accumulate its rows keyed by
    /// (account, asset, to_block). Fails with
    /// [`StoreError::WindowAlreadyCompressed`] without applying anything if
    /// the window was recorded before.
    async fn record_compressed_balances(
        &self,
        window: &CompressionWindow,
        rows: &[CompressedBalance],
    ) -> Result<(), StoreError>;
}
