//! Balance aggregation.
//!
//! Each ingested block is reduced to signed per-(account, asset) deltas by
//! [`compute_block_deltas`]. Once a fixed-size window of blocks is fully
//! stored, the [`CompressionScheduler`] folds the window's deltas into one row
//! per pair with [`compress_window`].

mod compressor;
mod delta;
mod error;
mod scheduler;
mod sheet;
mod types;

pub use compressor::compress_window;
pub use delta::{compute_block_deltas, TRANSFER_TOPIC};
pub use error::BalanceError;
pub use scheduler::{CompressionScheduler, TickOutcome};
pub use sheet::BalanceSheet;
pub use types::{BalanceDelta, CompressedBalance, CompressionWindow};
