use std::path::Path;

use anyhow::Context;
use serde::Deserialize;

use crate::types::config::chain::ChainConfig;
use crate::types::config::compression::CompressionConfig;
use crate::types::config::database::DatabaseConfig;
use crate::types::config::publish::PublishConfig;
use crate::types::config::queue::QueueConfig;

#[derive(Debug, Clone, Deserialize)]
pub struct IndexerConfig {
    pub chain: ChainConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub queue: QueueConfig,
    #[serde(default)]
    pub compression: CompressionConfig,
    pub publish: Option<PublishConfig>,
}

impl IndexerConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file at {}", path.display()))?;
        Self::from_json(&content)
            .with_context(|| format!("Failed to parse config file at {}", path.display()))
    }

    pub fn from_json(content: &str) -> anyhow::Result<Self> {
        let config: IndexerConfig = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(self.compression.size > 0, "compression.size must be positive");
        anyhow::ensure!(
            self.queue.worker_count > 0,
            "queue.worker_count must be positive"
        );
        // zero periods would panic in tokio::time::interval
        anyhow::ensure!(
            self.compression.check_interval_secs > 0,
            "compression.check_interval_secs must be positive"
        );
        anyhow::ensure!(
            self.queue.retry_interval_ms > 0,
            "queue.retry_interval_ms must be positive"
        );
        anyhow::ensure!(
            self.queue.head_poll_interval_ms > 0,
            "queue.head_poll_interval_ms must be positive"
        );
        anyhow::ensure!(
            !self.chain.rpc_url_env_var.is_empty(),
            "chain.rpc_url_env_var must not be empty"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_applied() {
        let config = IndexerConfig::from_json(
            r#"{ "chain": { "name": "mainnet", "chain_id": 1, "rpc_url_env_var": "RPC_URL" } }"#,
        )
        .unwrap();

        assert_eq!(config.chain.start_block, 0);
        assert_eq!(config.chain.block_receipts_method, "eth_getBlockReceipts");
        assert_eq!(config.database.database_url_env_var, "DATABASE_URL");
        assert_eq!(config.queue.worker_count, 8);
        assert_eq!(config.compression.size, 1000);
        assert_eq!(config.compression.check_interval_secs, 10);
        assert!(config.publish.is_none());
    }

    #[test]
    fn test_publish_section_enables_channel() {
        let config = IndexerConfig::from_json(
            r#"{
                "chain": { "name": "base", "chain_id": 8453, "rpc_url_env_var": "BASE_RPC" },
                "compression": { "size": 2, "check_interval_secs": 1 },
                "publish": {}
            }"#,
        )
        .unwrap();

        assert_eq!(config.compression.size, 2);
        assert_eq!(config.publish.unwrap().channel, "blocks");
    }

    #[test]
    fn test_zero_window_rejected() {
        let result = IndexerConfig::from_json(
            r#"{
                "chain": { "name": "mainnet", "chain_id": 1, "rpc_url_env_var": "RPC_URL" },
                "compression": { "size": 0 }
            }"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_zero_interval_rejected() {
        let cases = [
            (r#""compression": { "check_interval_secs": 0 }"#, "check_interval_secs"),
            (r#""queue": { "retry_interval_ms": 0 }"#, "retry_interval_ms"),
            (r#""queue": { "head_poll_interval_ms": 0 }"#, "head_poll_interval_ms"),
        ];

        for (section, field) in cases {
            let json = format!(
                r#"{{ "chain": {{ "name": "mainnet", "chain_id": 1, "rpc_url_env_var": "RPC_URL" }}, {} }}"#,
                section
            );
            let err = IndexerConfig::from_json(&json).unwrap_err();
            assert!(err.to_string().contains(field), "{field}: {err}");
        }
    }

    #[test]
    fn test_shipped_config_parses() {
        let config = IndexerConfig::from_json(include_str!("../../../config/config.json")).unwrap();
        assert_eq!(config.chain.requests_per_second, Some(25));
        assert!(config.publish.is_some());
    }
}
