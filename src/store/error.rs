use thiserror::Error;

use crate::db::DbError;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] DbError),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Block {0} has already been recorded")]
    BlockAlreadyRecorded(u64),

    #[error("Window ending at block {0} has already been compressed")]
    WindowAlreadyCompressed(u64),
}
