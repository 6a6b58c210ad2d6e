use std::sync::Arc;

use alloy::primitives::Address;
use async_trait::async_trait;
use tokio_postgres::Row;

use super::{BalanceStore, BlockStore, CompressedBalanceStore, StoreError};
use crate::balance::{BalanceDelta, CompressedBalance, CompressionWindow};
use crate::db::{DbError, DbOperation, DbPool, DbValue};
use crate::types::{Amount, Asset, BlockData, LogData, TransactionData};

/// Stores backed by the PostgreSQL schema in `migrations/`.
#[derive(Clone)]
pub struct PgStore {
    pool: Arc<DbPool>,
}

impl PgStore {
    pub fn new(pool: Arc<DbPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BlockStore for PgStore {
    async fn record_block(&self, block: &BlockData, deltas: &[BalanceDelta]) -> Result<(), StoreError> {
        let mut ops = block_operations(block);
        ops.extend(deltas.iter().map(accumulate_delta));

        self.pool
            .execute_transaction(ops)
            .await
            .map_err(|e| block_write_error(block.number, e))
    }

    async fn latest_block_number(&self) -> Result<Option<u64>, StoreError> {
        let rows = self.pool.query("SELECT MAX(number) FROM blocks", &[]).await?;
        first_optional_u64(&rows)
    }

    async fn missing_block_numbers(&self, from: u64, to: u64) -> Result<Vec<u64>, StoreError> {
        if from >= to {
            return Ok(Vec::new());
        }

        let (from, last) = (from as i64, (to - 1) as i64);
        let rows = self
            .pool
            .query(
                "SELECT n FROM generate_series($1::bigint, $2::bigint) AS n
                 WHERE NOT EXISTS (SELECT 1 FROM blocks WHERE number = n)
                 ORDER BY n",
                &[&from, &last],
            )
            .await?;

        rows.iter()
            .map(|row| {
                let number: i64 = row.try_get(0).map_err(DbError::from)?;
                Ok(number as u64)
            })
            .collect()
    }
}

#[async_trait]
impl BalanceStore for PgStore {
    async fn record_block_deltas(&self, deltas: &[BalanceDelta]) -> Result<(), StoreError> {
        let ops = deltas.iter().map(accumulate_delta).collect();
        Ok(self.pool.execute_transaction(ops).await?)
    }

    async fn count_blocks_in_range(&self, from: u64, to: u64) -> Result<u64, StoreError> {
        let (from, to) = (from as i64, to as i64);
        let rows = self
            .pool
            .query(
                "SELECT COUNT(*) FROM blocks WHERE number >= $1 AND number < $2",
                &[&from, &to],
            )
            .await?;

        let count: i64 = match rows.first() {
            Some(row) => row.try_get(0).map_err(DbError::from)?,
            None => 0,
        };
        Ok(count as u64)
    }

    async fn deltas_in_range(&self, from: u64, to: u64) -> Result<Vec<BalanceDelta>, StoreError> {
        let (from, to) = (from as i64, to as i64);
        let rows = self
            .pool
            .query(
                "SELECT account, asset, block_number, amount::text
                 FROM block_balances
                 WHERE block_number >= $1 AND block_number < $2",
                &[&from, &to],
            )
            .await?;

        rows.iter().map(decode_delta).collect()
    }
}

#[async_trait]
impl CompressedBalanceStore for PgStore {
    async fn last_compressed_window_end(&self) -> Result<Option<u64>, StoreError> {
        let rows = self
            .pool
            .query("SELECT MAX(to_block) FROM compressed_windows", &[])
            .await?;
        first_optional_u64(&rows)
    }

    async fn record_compressed_balances(
        &self,
        window: &CompressionWindow,
        rows: &[CompressedBalance],
    ) -> Result<(), StoreError> {
        // the window marker goes first so a replay fails before touching balances
        let mut ops = vec![insert_window(window, rows.len())];
        ops.extend(rows.iter().map(accumulate_compressed));

        self.pool
            .execute_transaction(ops)
            .await
            .map_err(|e| window_write_error(window, e))
    }
}

const BLOCKS_PKEY: &str = "blocks_pkey";
const COMPRESSED_WINDOWS_PKEY: &str = "compressed_windows_pkey";

/// Only a clash on the block row itself means the block is already stored.
/// Any other conflict (a transaction hash seen in another block, a repeated
/// log index) is a real failure and leaves the block to be retried.
fn block_write_error(number: u64, e: DbError) -> StoreError {
    if e.violated_constraint() == Some(BLOCKS_PKEY) {
        StoreError::BlockAlreadyRecorded(number)
    } else {
        e.into()
    }
}

fn window_write_error(window: &CompressionWindow, e: DbError) -> StoreError {
    if e.violated_constraint() == Some(COMPRESSED_WINDOWS_PKEY) {
        StoreError::WindowAlreadyCompressed(window.to_block())
    } else {
        e.into()
    }
}

fn address_bytes(addr: Address) -> [u8; 20] {
    addr.0 .0
}

fn columns(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

fn block_operations(block: &BlockData) -> Vec<DbOperation> {
    let mut ops = vec![DbOperation::Insert {
        table: "blocks".to_string(),
        columns: columns(&[
            "number",
            "hash",
            "parent_hash",
            "timestamp",
            "miner",
            "gas_used",
            "gas_limit",
            "transaction_count",
        ]),
        values: vec![
            DbValue::Uint64(block.number),
            DbValue::Bytes32(block.hash.0),
            DbValue::Bytes32(block.parent_hash.0),
            DbValue::Timestamp(block.timestamp),
            DbValue::Address(address_bytes(block.miner)),
            DbValue::Uint64(block.gas_used),
            DbValue::Uint64(block.gas_limit),
            DbValue::Uint64(block.transactions.len() as u64),
        ],
    }];

    for (index, tx) in block.transactions.iter().enumerate() {
        ops.push(insert_transaction(block.number, index as u64, tx));
        ops.extend(tx.logs.iter().map(|log| insert_event(block.number, tx, log)));
    }

    ops
}

fn insert_transaction(block_number: u64, index: u64, tx: &TransactionData) -> DbOperation {
    DbOperation::Insert {
        table: "transactions".to_string(),
        columns: columns(&[
            "hash",
            "block_number",
            "transaction_index",
            "from_address",
            "to_address",
            "contract_address",
            "value",
            "gas_price",
            "gas_used",
            "nonce",
            "status",
        ]),
        values: vec![
            DbValue::Bytes32(tx.hash.0),
            DbValue::Uint64(block_number),
            DbValue::Uint64(index),
            DbValue::Address(address_bytes(tx.from)),
            DbValue::optional_address(tx.to.map(address_bytes)),
            DbValue::optional_address(tx.contract_address.map(address_bytes)),
            DbValue::Numeric(tx.value.clone()),
            DbValue::Numeric(tx.gas_price.clone()),
            DbValue::Uint64(tx.gas_used),
            DbValue::Uint64(tx.nonce),
            DbValue::Bool(tx.status),
        ],
    }
}

fn insert_event(block_number: u64, tx: &TransactionData, log: &LogData) -> DbOperation {
    let topic = |i: usize| DbValue::optional_bytes32(log.topics.get(i).map(|t| t.0));

    DbOperation::Insert {
        table: "events".to_string(),
        columns: columns(&[
            "block_number",
            "log_index",
            "transaction_hash",
            "address",
            "topic0",
            "topic1",
            "topic2",
            "topic3",
            "data",
        ]),
        values: vec![
            DbValue::Uint64(block_number),
            DbValue::Uint64(log.log_index),
            DbValue::Bytes32(tx.hash.0),
            DbValue::Address(address_bytes(log.address)),
            topic(0),
            topic(1),
            topic(2),
            topic(3),
            DbValue::Bytes(log.data.to_vec()),
        ],
    }
}

fn accumulate_delta(delta: &BalanceDelta) -> DbOperation {
    DbOperation::Accumulate {
        table: "block_balances".to_string(),
        columns: columns(&["account", "asset", "block_number", "amount"]),
        values: vec![
            DbValue::Address(address_bytes(delta.account)),
            DbValue::Bytes(delta.asset.as_bytes().to_vec()),
            DbValue::Uint64(delta.block_number),
            DbValue::Numeric(delta.amount.to_string()),
        ],
        conflict_columns: columns(&["account", "asset", "block_number"]),
        accumulate_columns: columns(&["amount"]),
    }
}

fn accumulate_compressed(row: &CompressedBalance) -> DbOperation {
    DbOperation::Accumulate {
        table: "compressed_balances".to_string(),
        columns: columns(&["account", "asset", "to_block", "amount"]),
        values: vec![
            DbValue::Address(address_bytes(row.account)),
            DbValue::Bytes(row.asset.as_bytes().to_vec()),
            DbValue::Uint64(row.to_block),
            DbValue::Numeric(row.amount.to_string()),
        ],
        conflict_columns: columns(&["account", "asset", "to_block"]),
        accumulate_columns: columns(&["amount"]),
    }
}

fn insert_window(window: &CompressionWindow, row_count: usize) -> DbOperation {
    DbOperation::Insert {
        table: "compressed_windows".to_string(),
        columns: columns(&["to_block", "from_block", "row_count"]),
        values: vec![
            DbValue::Uint64(window.to_block()),
            DbValue::Uint64(window.from_block),
            DbValue::Uint64(row_count as u64),
        ],
    }
}

fn first_optional_u64(rows: &[Row]) -> Result<Option<u64>, StoreError> {
    let Some(row) = rows.first() else {
        return Ok(None);
    };
    let value: Option<i64> = row.try_get(0).map_err(DbError::from)?;
    Ok(value.map(|v| v as u64))
}

fn decode_delta(row: &Row) -> Result<BalanceDelta, StoreError> {
    let account: Vec<u8> = row.try_get(0).map_err(DbError::from)?;
    let asset: Vec<u8> = row.try_get(1).map_err(DbError::from)?;
    let block_number: i64 = row.try_get(2).map_err(DbError::from)?;
    let amount: String = row.try_get(3).map_err(DbError::from)?;

    if account.len() != 20 {
        return Err(StoreError::Decode(format!(
            "account of {} bytes in block_balances",
            account.len()
        )));
    }
    let asset = Asset::from_bytes(&asset).ok_or_else(|| {
        StoreError::Decode(format!("asset of {} bytes in block_balances", asset.len()))
    })?;
    let amount = Amount::from_dec_str(&amount).map_err(|e| StoreError::Decode(e.to_string()))?;

    Ok(BalanceDelta {
        account: Address::from_slice(&account),
        asset,
        block_number: block_number as u64,
        amount,
    })
}
