pub mod amount;
pub mod asset;
pub mod chain;
pub mod config;

pub use amount::{Amount, ParseAmountError};
pub use asset::Asset;
pub use chain::{BlockData, LogData, TransactionData};
