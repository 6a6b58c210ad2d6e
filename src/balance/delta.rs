//! Per-block balance deltas.
//!
//! For every transaction, in block order:
//! - the sender pays `gas_used * gas_price + value` in the native currency
//! - the recipient, if any, receives `value`
//! - every `Transfer(address,address,uint256)` log with exactly three topics
//!   moves `data` units of the emitting contract's token from `topics[1]` to
//!   `topics[2]`
//!
//! Fees are not credited to anyone. Logs with any other shape are ignored.

use alloy::primitives::{b256, Address, B256};

use super::error::BalanceError;
use super::sheet::BalanceSheet;
use super::types::BalanceDelta;
use crate::types::{Amount, Asset, BlockData, LogData, TransactionData};

/// keccak256("Transfer(address,address,uint256)")
pub const TRANSFER_TOPIC: B256 =
    b256!("0xddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef");

/// Net (account, asset) balance changes caused by `block` alone.
pub fn compute_block_deltas(block: &BlockData) -> Result<Vec<BalanceDelta>, BalanceError> {
    let mut sheet = BalanceSheet::new();

    for tx in &block.transactions {
        apply_transaction(&mut sheet, block.number, tx)?;
    }

    Ok(sheet.into_block_deltas(block.number))
}

fn apply_transaction(
    sheet: &mut BalanceSheet,
    block_number: u64,
    tx: &TransactionData,
) -> Result<(), BalanceError> {
    let value = Amount::from_dec_str(&tx.value)
        .map_err(|e| BalanceError::data_integrity(block_number, tx.hash, "value", e))?;
    let gas_price = Amount::from_dec_str(&tx.gas_price)
        .map_err(|e| BalanceError::data_integrity(block_number, tx.hash, "gas_price", e))?;

    let cost = &gas_price.mul_u64(tx.gas_used) + &value;
    sheet.debit(tx.from, Asset::Native, &cost);

    if let Some(to) = tx.to {
        sheet.credit(to, Asset::Native, &value);
    }

    for log in &tx.logs {
        let Some((from, to)) = transfer_parties(log) else {
            continue;
        };

        let amount = Amount::from_be_bytes(&log.data)
            .map_err(|e| BalanceError::data_integrity(block_number, tx.hash, "log.data", e))?;
        let asset = Asset::Token(log.address);

        sheet.debit(from, asset, &amount);
        sheet.credit(to, asset, &amount);
    }

    Ok(())
}

/// `(from, to)` when `log` is a three-topic `Transfer` event.
fn transfer_parties(log: &LogData) -> Option<(Address, Address)> {
    match log.topics.as_slice() {
        [signature, from, to] if *signature == TRANSFER_TOPIC => {
            Some((Address::from_word(*from), Address::from_word(*to)))
        }
        _ => None,
    }
}
