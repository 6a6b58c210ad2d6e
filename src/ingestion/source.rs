use async_trait::async_trait;

use crate::rpc::{RpcClient, RpcError};
use crate::types::BlockData;

/// Where decoded blocks come from.
#[async_trait]
pub trait BlockSource: Send + Sync {
    /// Number of the chain head.
    async fn latest_block_number(&self) -> Result<u64, RpcError>;

    /// The block with its transactions, receipts and logs, or `None` if the
    /// source does not have it yet.
    async fn fetch_block(&self, number: u64) -> Result<Option<BlockData>, RpcError>;
}

#[async_trait]
impl BlockSource for RpcClient {
    async fn latest_block_number(&self) -> Result<u64, RpcError> {
        self.get_block_number().await
    }

    async fn fetch_block(&self, number: u64) -> Result<Option<BlockData>, RpcError> {
        self.get_block_data(number).await
    }
}
