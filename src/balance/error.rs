use alloy::primitives::B256;
use thiserror::Error;

use crate::types::ParseAmountError;

#[derive(Debug, Error)]
pub enum BalanceError {
    /// A numeric field in the chain data could not be parsed. The block's
    /// deltas are not trustworthy and must not be persisted.
    #[error("Data integrity fault in block {block_number}, tx {transaction_hash}, field {field}: {source}")]
    DataIntegrity {
        block_number: u64,
        transaction_hash: B256,
        field: &'static str,
        #[source]
        source: ParseAmountError,
    },
}

impl BalanceError {
    pub fn data_integrity(
        block_number: u64,
        transaction_hash: B256,
        field: &'static str,
        source: ParseAmountError,
    ) -> Self {
        Self::DataIntegrity {
            block_number,
            transaction_hash,
            field,
            source,
        }
    }
}
