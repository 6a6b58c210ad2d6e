use std::collections::BTreeMap;

use alloy::primitives::Address;

use super::types::{BalanceDelta, CompressedBalance};
use crate::types::{Amount, Asset};

/// Running net balance change per (account, asset).
///
/// Every pair that is touched gets an entry, even if its movements cancel
/// out, so a self-transfer still yields a zero row. Iteration order is
/// deterministic (by account, then asset).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BalanceSheet {
    entries: BTreeMap<(Address, Asset), Amount>,
}

impl BalanceSheet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, account: Address, asset: Asset, amount: &Amount) {
        *self.entries.entry((account, asset)).or_default() += amount;
    }

    pub fn credit(&mut self, account: Address, asset: Asset, amount: &Amount) {
        self.add(account, asset, amount);
    }

    pub fn debit(&mut self, account: Address, asset: Asset, amount: &Amount) {
        *self.entries.entry((account, asset)).or_default() -= amount;
    }

    pub fn get(&self, account: Address, asset: Asset) -> Option<&Amount> {
        self.entries.get(&(account, asset))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn into_block_deltas(self, block_number: u64) -> Vec<BalanceDelta> {
        self.entries
            .into_iter()
            .map(|((account, asset), amount)| BalanceDelta {
                account,
                asset,
                block_number,
                amount,
            })
            .collect()
    }

    pub fn into_compressed(self, to_block: u64) -> Vec<CompressedBalance> {
        self.entries
            .into_iter()
            .map(|((account, asset), amount)| CompressedBalance {
                account,
                asset,
                to_block,
                amount,
            })
            .collect()
    }
}
