use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct ChainConfig {
    pub name: String,
    pub chain_id: u64,
    pub rpc_url_env_var: String,
    /// First block to ingest when nothing has been stored yet.
    #[serde(default)]
    pub start_block: u64,
    #[serde(default = "default_block_receipts_method")]
    pub block_receipts_method: String,
    /// Requests per second allowed against the RPC endpoint. Unlimited when absent.
    pub requests_per_second: Option<u32>,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Backoff before the first RPC retry, doubled on each further retry.
    #[serde(default = "default_retry_initial_delay_ms")]
    pub retry_initial_delay_ms: u64,
    #[serde(default = "default_retry_max_delay_ms")]
    pub retry_max_delay_ms: u64,
}

fn default_block_receipts_method() -> String {
    "eth_getBlockReceipts".to_string()
}

fn default_max_retries() -> u32 {
    10
}

fn default_retry_initial_delay_ms() -> u64 {
    500
}

fn default_retry_max_delay_ms() -> u64 {
    30_000
}
