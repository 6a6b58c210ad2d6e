use alloy::primitives::Address;
use serde::Serialize;

use crate::types::{Amount, Asset};

/// Net change of one (account, asset) pair within a single block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BalanceDelta {
    pub account: Address,
    pub asset: Asset,
    pub block_number: u64,
    pub amount: Amount,
}

/// Net change of one (account, asset) pair across a compression window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompressedBalance {
    pub account: Address,
    pub asset: Asset,
    /// Last block of the window, inclusive.
    pub to_block: u64,
    pub amount: Amount,
}

/// A contiguous run of `size` blocks starting at `from_block`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompressionWindow {
    pub from_block: u64,
    pub size: u64,
}

impl CompressionWindow {
    pub fn new(from_block: u64, size: u64) -> Self {
        Self { from_block, size }
    }

    /// The window following one that ended at `last_to_block`, or the first
    /// window of the chain when nothing has been compressed yet.
    pub fn after(last_to_block: Option<u64>, size: u64) -> Self {
        Self::new(last_to_block.map_or(0, |to| to + 1), size)
    }

    /// Exclusive upper bound.
    pub fn end(&self) -> u64 {
        self.from_block + self.size
    }

    /// Inclusive upper bound, the key compressed rows are stored under.
    pub fn to_block(&self) -> u64 {
        self.end() - 1
    }

    pub fn contains(&self, block_number: u64) -> bool {
        (self.from_block..self.end()).contains(&block_number)
    }
}
