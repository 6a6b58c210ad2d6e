use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum QueueError {
    /// The block number is not tracked by the queue.
    #[error("Block {0} is not tracked by the processor queue")]
    NotFound(u64),

    /// No block is currently eligible for retry.
    #[error("No block is eligible for retry")]
    Empty,
}
