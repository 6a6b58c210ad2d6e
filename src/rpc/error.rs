use alloy::primitives::B256;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RpcError {
    #[error("RPC transport error: {0}")]
    Transport(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("Provider error: {0}")]
    ProviderError(String),

    #[error("Malformed RPC response: {0}")]
    Decode(String),

    #[error("No receipt for transaction {transaction_hash} in block {block_number}")]
    MissingReceipt {
        block_number: u64,
        transaction_hash: B256,
    },
}

impl RpcError {
    /// Check if this error is likely transient and worth retrying
    pub fn is_retryable(&self) -> bool {
        match self {
            RpcError::Transport(_) | RpcError::RateLimitExceeded => true,
            RpcError::ProviderError(msg) => Self::is_retryable_message(msg),
            // raised after the calls returned; the block queue retries the block
            RpcError::MissingReceipt { .. } => false,
            RpcError::InvalidUrl(_) | RpcError::Decode(_) => false,
        }
    }

    fn is_retryable_message(msg: &str) -> bool {
        const TRANSIENT: &[&str] = &[
            // network
            "connection",
            "timeout",
            "timed out",
            "reset",
            "broken pipe",
            "network",
            "eof",
            "sending request",
            // rate limiting
            "rate limit",
            "too many requests",
            "429",
            // server side
            "502",
            "503",
            "504",
            "internal server error",
            "service unavailable",
            "bad gateway",
            "temporarily",
            "try again",
        ];

        let msg_lower = msg.to_lowercase();
        TRANSIENT.iter().any(|needle| msg_lower.contains(needle))
    }
}
