//! Test doubles for the chain source and the publisher.

use std::collections::{BTreeMap, HashSet};

use alloy::primitives::{Address, B256};
use async_trait::async_trait;
use parking_lot::Mutex;

use super::publisher::{BlockPublisher, PublishError, PublishedBlock};
use super::source::BlockSource;
use crate::rpc::RpcError;
use crate::types::{BlockData, TransactionData};

pub const ALICE: Address = Address::repeat_byte(0xa1);
pub const BOB: Address = Address::repeat_byte(0xb0);

/// Block `number` with one plain transfer of `value` from Alice to Bob.
pub fn transfer_block(number: u64, value: &str) -> BlockData {
    BlockData {
        number,
        hash: B256::with_last_byte(number as u8),
        parent_hash: B256::ZERO,
        timestamp: 1_700_000_000 + number,
        miner: Address::ZERO,
        gas_used: 21_000,
        gas_limit: 30_000_000,
        transactions: vec![TransactionData {
            hash: B256::repeat_byte(number as u8),
            from: ALICE,
            to: Some(BOB),
            contract_address: None,
            value: value.to_string(),
            gas_price: "1".to_string(),
            gas_used: 21_000,
            nonce: number,
            status: true,
            logs: Vec::new(),
        }],
    }
}

#[derive(Default)]
pub struct MockSource {
    blocks: Mutex<BTreeMap<u64, BlockData>>,
    failing: Mutex<HashSet<u64>>,
}

impl MockSource {
    pub fn with_blocks(blocks: impl IntoIterator<Item = BlockData>) -> Self {
        let source = Self::default();
        for block in blocks {
            source.insert(block);
        }
        source
    }

    pub fn insert(&self, block: BlockData) {
        self.blocks.lock().insert(block.number, block);
    }

    pub fn set_failing(&self, number: u64, failing: bool) {
        let mut set = self.failing.lock();
        if failing {
            set.insert(number);
        } else {
            set.remove(&number);
        }
    }
}

#[async_trait]
impl BlockSource for MockSource {
    async fn latest_block_number(&self) -> Result<u64, RpcError> {
        Ok(self.blocks.lock().keys().next_back().copied().unwrap_or(0))
    }

    async fn fetch_block(&self, number: u64) -> Result<Option<BlockData>, RpcError> {
        if self.failing.lock().contains(&number) {
            return Err(RpcError::Transport("connection refused".to_string()));
        }
        Ok(self.blocks.lock().get(&number).cloned())
    }
}

#[derive(Default)]
pub struct RecordingPublisher {
    published: Mutex<Vec<PublishedBlock>>,
}

impl RecordingPublisher {
    pub fn published(&self) -> Vec<PublishedBlock> {
        self.published.lock().clone()
    }
}

#[async_trait]
impl BlockPublisher for RecordingPublisher {
    async fn publish(&self, block: &PublishedBlock) -> Result<(), PublishError> {
        self.published.lock().push(block.clone());
        Ok(())
    }
}
