use std::sync::Arc;

use alloy::primitives::B256;
use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use crate::balance::BalanceDelta;
use crate::db::{DbError, DbOperation, DbPool, DbValue};
use crate::types::BlockData;

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("Database error: {0}")]
    Db(#[from] DbError),

    #[error("Failed to serialize announcement: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Announcement sent once per ingested block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublishedBlock {
    pub number: u64,
    pub hash: B256,
    pub transaction_count: usize,
    pub delta_count: usize,
}

impl PublishedBlock {
    pub fn new(block: &BlockData, deltas: &[BalanceDelta]) -> Self {
        Self {
            number: block.number,
            hash: block.hash,
            transaction_count: block.transactions.len(),
            delta_count: deltas.len(),
        }
    }
}

#[async_trait]
pub trait BlockPublisher: Send + Sync {
    async fn publish(&self, block: &PublishedBlock) -> Result<(), PublishError>;
}

/// Publishes on a PostgreSQL `NOTIFY` channel with a JSON payload.
pub struct PgNotifyPublisher {
    pool: Arc<DbPool>,
    channel: String,
}

impl PgNotifyPublisher {
    pub fn new(pool: Arc<DbPool>, channel: impl Into<String>) -> Self {
        Self {
            pool,
            channel: channel.into(),
        }
    }
}

fn notify_operation(channel: &str, block: &PublishedBlock) -> Result<DbOperation, PublishError> {
    Ok(DbOperation::RawSql {
        query: "SELECT pg_notify($1, $2)".to_string(),
        params: vec![
            DbValue::Text(channel.to_string()),
            DbValue::Text(serde_json::to_string(block)?),
        ],
    })
}

#[async_trait]
impl BlockPublisher for PgNotifyPublisher {
    async fn publish(&self, block: &PublishedBlock) -> Result<(), PublishError> {
        let op = notify_operation(&self.channel, block)?;
        self.pool.execute_transaction(vec![op]).await?;
        tracing::debug!("Published block {} on channel {}", block.number, self.channel);
        Ok(())
    }
}
