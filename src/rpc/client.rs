use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use alloy::network::Ethereum;
use alloy::primitives::BlockNumber;
use alloy::providers::{Provider, RootProvider};
use alloy::transports::TransportError;
use governor::clock::{QuantaClock, QuantaInstant};
use governor::middleware::NoOpMiddleware;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Jitter, Quota, RateLimiter};
use url::Url;

use super::error::RpcError;
use super::retry::{with_retry, RetryConfig};
use super::types::{assemble_block, RpcBlock, RpcReceipt};
use crate::types::config::chain::ChainConfig;
use crate::types::BlockData;

pub type StandardRateLimiter =
    RateLimiter<NotKeyed, InMemoryState, QuantaClock, NoOpMiddleware<QuantaInstant>>;

#[derive(Debug, Clone)]
pub struct RpcClientConfig {
    pub url: Url,
    /// Method returning every receipt of a block, e.g. `eth_getBlockReceipts`.
    pub block_receipts_method: String,
    pub rate_limit: Option<RateLimitConfig>,
    pub retry: RetryConfig,
}

#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    pub requests_per_second: NonZeroU32,
    pub jitter_min_ms: u64,
    pub jitter_max_ms: u64,
}

impl RateLimitConfig {
    pub fn new(requests_per_second: NonZeroU32) -> Self {
        Self {
            requests_per_second,
            jitter_min_ms: 5,
            jitter_max_ms: 50,
        }
    }
}

impl RpcClientConfig {
    /// Settings for `chain`, reaching the node at `url`.
    pub fn for_chain(url: Url, chain: &ChainConfig) -> Self {
        let rate_limit = chain
            .requests_per_second
            .and_then(NonZeroU32::new)
            .map(RateLimitConfig::new);

        Self {
            url,
            block_receipts_method: chain.block_receipts_method.clone(),
            rate_limit,
            retry: RetryConfig::new(chain.max_retries)
                .with_initial_delay(Duration::from_millis(chain.retry_initial_delay_ms))
                .with_max_delay(Duration::from_millis(chain.retry_max_delay_ms)),
        }
    }
}

pub struct RpcClient {
    provider: RootProvider<Ethereum>,
    config: RpcClientConfig,
    rate_limiter: Option<Arc<StandardRateLimiter>>,
    jitter: Option<Jitter>,
}

impl RpcClient {
    pub fn new(config: RpcClientConfig) -> Result<Self, RpcError> {
        let provider = RootProvider::<Ethereum>::new_http(config.url.clone());

        let (rate_limiter, jitter) = if let Some(ref rate_config) = config.rate_limit {
            let quota = Quota::per_second(rate_config.requests_per_second);
            let limiter = RateLimiter::direct(quota);
            let jitter = Jitter::new(
                Duration::from_millis(rate_config.jitter_min_ms),
                Duration::from_millis(rate_config.jitter_max_ms),
            );
            (Some(Arc::new(limiter)), Some(jitter))
        } else {
            (None, None)
        };

        Ok(Self {
            provider,
            config,
            rate_limiter,
            jitter,
        })
    }

    pub fn for_chain(url: &str, chain: &ChainConfig) -> Result<Self, RpcError> {
        let url = Url::parse(url).map_err(|e| RpcError::InvalidUrl(e.to_string()))?;
        Self::new(RpcClientConfig::for_chain(url, chain))
    }

    async fn wait_for_rate_limit(&self) {
        if let (Some(limiter), Some(jitter)) = (&self.rate_limiter, &self.jitter) {
            limiter.until_ready_with_jitter(*jitter).await;
        }
    }

    pub async fn get_block_number(&self) -> Result<BlockNumber, RpcError> {
        with_retry(&self.config.retry, "eth_blockNumber", || async {
            self.wait_for_rate_limit().await;
            self.provider
                .get_block_number()
                .await
                .map_err(classify)
        })
        .await
    }

    /// Block with full transaction objects, `None` past the chain head.
    pub async fn get_raw_block(&self, number: u64) -> Result<Option<RpcBlock>, RpcError> {
        let block_param = format!("0x{:x}", number);
        let op_name = format!("eth_getBlockByNumber({})", number);

        let value: serde_json::Value = with_retry(&self.config.retry, &op_name, || async {
            self.wait_for_rate_limit().await;
            self.provider
                .client()
                .request("eth_getBlockByNumber", (block_param.clone(), true))
                .await
                .map_err(classify)
        })
        .await?;

        if value.is_null() {
            return Ok(None);
        }
        serde_json::from_value(value)
            .map(Some)
            .map_err(|e| RpcError::Decode(format!("block {}: {}", number, e)))
    }

    pub async fn get_block_receipts(&self, number: u64) -> Result<Vec<RpcReceipt>, RpcError> {
        let method = self.config.block_receipts_method.clone();
        let block_param = format!("0x{:x}", number);
        let op_name = format!("{}({})", method, number);

        let value: serde_json::Value = with_retry(&self.config.retry, &op_name, || async {
            self.wait_for_rate_limit().await;
            self.provider
                .client()
                .request(method.clone(), (block_param.clone(),))
                .await
                .map_err(classify)
        })
        .await?;

        // null when the node has not indexed the block yet
        if value.is_null() {
            return Ok(Vec::new());
        }
        serde_json::from_value(value)
            .map_err(|e| RpcError::Decode(format!("receipts of block {}: {}", number, e)))
    }

    /// Block and receipts joined into [`BlockData`], `None` past the chain head.
    pub async fn get_block_data(&self, number: u64) -> Result<Option<BlockData>, RpcError> {
        let Some(block) = self.get_raw_block(number).await? else {
            return Ok(None);
        };

        let receipts = if block.transactions.is_empty() {
            Vec::new()
        } else {
            self.get_block_receipts(number).await?
        };

        assemble_block(block, receipts).map(Some)
    }
}

fn classify(e: TransportError) -> RpcError {
    let msg = e.to_string();
    if e.is_transport_error() {
        if msg.contains("429") {
            RpcError::RateLimitExceeded
        } else {
            RpcError::Transport(msg)
        }
    } else if e.is_deser_error() {
        RpcError::Decode(msg)
    } else {
        RpcError::ProviderError(msg)
    }
}

impl std::fmt::Debug for RpcClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcClient")
            .field("config", &self.config)
            .field("has_rate_limiter", &self.rate_limiter.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain(requests_per_second: Option<u32>) -> ChainConfig {
        serde_json::from_value(serde_json::json!({
            "name": "testnet",
            "chain_id": 1,
            "rpc_url_env_var": "TEST_RPC_URL",
            "requests_per_second": requests_per_second,
            "max_retries": 3,
            "retry_initial_delay_ms": 200,
        }))
        .unwrap()
    }

    #[test]
    fn test_config_for_chain() {
        let url = Url::parse("http://localhost:8545").unwrap();
        let config = RpcClientConfig::for_chain(url, &chain(Some(25)));

        assert_eq!(config.block_receipts_method, "eth_getBlockReceipts");
        assert_eq!(config.retry.max_retries, 3);
        assert_eq!(config.retry.initial_delay, Duration::from_millis(200));
        assert_eq!(config.retry.max_delay, Duration::from_secs(30));
        assert_eq!(
            config.rate_limit.map(|r| r.requests_per_second.get()),
            Some(25)
        );
    }

    #[test]
    fn test_zero_rate_means_unlimited() {
        let url = Url::parse("http://localhost:8545").unwrap();
        assert!(RpcClientConfig::for_chain(url, &chain(Some(0))).rate_limit.is_none());
    }

    #[test]
    fn test_invalid_url() {
        assert!(matches!(
            RpcClient::for_chain("not a url", &chain(None)),
            Err(RpcError::InvalidUrl(_))
        ));
    }
}
