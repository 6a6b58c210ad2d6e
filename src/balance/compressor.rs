use super::sheet::BalanceSheet;
use super::types::{BalanceDelta, CompressedBalance, CompressionWindow};

/// Fold the per-block deltas of `window` into one row per (account, asset).
///
/// Rows outside the window are skipped. An empty input yields no rows.
pub fn compress_window(window: &CompressionWindow, deltas: &[BalanceDelta]) -> Vec<CompressedBalance> {
    let mut sheet = BalanceSheet::new();

    for delta in deltas {
        if !window.contains(delta.block_number) {
            tracing::warn!(
                "Skipping delta for block {} outside compression window {}-{}",
                delta.block_number,
                window.from_block,
                window.to_block()
            );
            continue;
        }
        sheet.add(delta.account, delta.asset, &delta.amount);
    }

    sheet.into_compressed(window.to_block())
}
