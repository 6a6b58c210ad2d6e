//! JSON-RPC response shapes for blocks and receipts.
//!
//! Only the fields the indexer stores are decoded, which keeps the client
//! tolerant of chain-specific transaction types and extra fields.

use std::collections::HashMap;

use alloy::primitives::{Address, Bytes, B256, U256, U64};
use serde::Deserialize;

use super::error::RpcError;
use crate::types::{BlockData, LogData, TransactionData};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcBlock {
    pub number: U64,
    pub hash: B256,
    pub parent_hash: B256,
    pub timestamp: U64,
    pub miner: Address,
    pub gas_used: U64,
    pub gas_limit: U64,
    #[serde(default)]
    pub transactions: Vec<RpcTransaction>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcTransaction {
    pub hash: B256,
    pub from: Address,
    pub to: Option<Address>,
    pub value: U256,
    pub nonce: U64,
    /// Absent on some typed transactions, where the receipt carries the
    /// effective price instead.
    pub gas_price: Option<U256>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcReceipt {
    pub transaction_hash: B256,
    pub gas_used: U64,
    pub effective_gas_price: Option<U256>,
    pub contract_address: Option<Address>,
    /// Missing before Byzantium, where the receipt carries a state root.
    pub status: Option<U64>,
    #[serde(default)]
    pub logs: Vec<RpcLog>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcLog {
    pub address: Address,
    pub topics: Vec<B256>,
    pub data: Bytes,
    pub log_index: Option<U64>,
}

/// Join a block with its receipts into the indexer's block model.
///
/// Every transaction must have a receipt. The gas price is the receipt's
/// effective price, falling back to the price on the transaction.
pub fn assemble_block(block: RpcBlock, receipts: Vec<RpcReceipt>) -> Result<BlockData, RpcError> {
    let block_number = block.number.to::<u64>();
    let mut receipts: HashMap<B256, RpcReceipt> = receipts
        .into_iter()
        .map(|r| (r.transaction_hash, r))
        .collect();

    let mut next_log_index = 0u64;
    let mut transactions = Vec::with_capacity(block.transactions.len());

    for tx in block.transactions {
        let receipt = receipts
            .remove(&tx.hash)
            .ok_or(RpcError::MissingReceipt {
                block_number,
                transaction_hash: tx.hash,
            })?;

        let gas_price = receipt
            .effective_gas_price
            .or(tx.gas_price)
            .ok_or_else(|| {
                RpcError::Decode(format!(
                    "transaction {} in block {} has no gas price",
                    tx.hash, block_number
                ))
            })?;

        let logs = receipt
            .logs
            .into_iter()
            .map(|log| {
                let log_index = log.log_index.map_or(next_log_index, |i| i.to::<u64>());
                next_log_index = log_index + 1;
                LogData {
                    address: log.address,
                    log_index,
                    topics: log.topics,
                    data: log.data,
                }
            })
            .collect();

        transactions.push(TransactionData {
            hash: tx.hash,
            from: tx.from,
            to: tx.to,
            contract_address: receipt.contract_address,
            value: tx.value.to_string(),
            gas_price: gas_price.to_string(),
            gas_used: receipt.gas_used.to::<u64>(),
            nonce: tx.nonce.to::<u64>(),
            status: receipt.status.map_or(true, |s| !s.is_zero()),
            logs,
        });
    }

    if !receipts.is_empty() {
        tracing::warn!(
            "Block {} returned {} receipts without a matching transaction",
            block_number,
            receipts.len()
        );
    }

    Ok(BlockData {
        number: block_number,
        hash: block.hash,
        parent_hash: block.parent_hash,
        timestamp: block.timestamp.to::<u64>(),
        miner: block.miner,
        gas_used: block.gas_used.to::<u64>(),
        gas_limit: block.gas_limit.to::<u64>(),
        transactions,
    })
}
