//! Decoded chain data handed to the aggregation core.
//!
//! These are the shapes produced by a [`BlockSource`](crate::ingestion::BlockSource).
//! Monetary fields on transactions are kept as decimal strings exactly as the
//! source rendered them; turning them into [`Amount`](super::Amount)s is the
//! balance computer's job, and a malformed value must surface there as a
//! data-integrity fault rather than being coerced at the boundary.

use alloy::primitives::{Address, Bytes, B256};

/// Log data attached to a transaction receipt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogData {
    pub address: Address,
    pub log_index: u64,
    pub topics: Vec<B256>,
    pub data: Bytes,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionData {
    pub hash: B256,
    pub from: Address,
    /// `None` for contract creation.
    pub to: Option<Address>,
    /// Address of the created contract, if any.
    pub contract_address: Option<Address>,
    /// Transferred value in wei, base 10.
    pub value: String,
    /// Price paid per unit of gas in wei, base 10.
    pub gas_price: String,
    pub gas_used: u64,
    pub nonce: u64,
    pub status: bool,
    pub logs: Vec<LogData>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockData {
    pub number: u64,
    pub hash: B256,
    pub parent_hash: B256,
    pub timestamp: u64,
    pub miner: Address,
    pub gas_used: u64,
    pub gas_limit: u64,
    pub transactions: Vec<TransactionData>,
}
