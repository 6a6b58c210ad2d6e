use std::time::Duration;

use serde::Deserialize;

/// Settings for the ingestion loops that feed the block processor queue.
#[derive(Debug, Clone, Deserialize)]
pub struct QueueConfig {
    /// Maximum number of blocks processed concurrently.
    #[serde(default = "default_worker_count")]
    pub worker_count: usize,

    /// How often failed blocks are pulled back out of the queue.
    #[serde(default = "default_retry_interval_ms")]
    pub retry_interval_ms: u64,

    /// How often the chain head is polled for new blocks.
    #[serde(default = "default_head_poll_interval_ms")]
    pub head_poll_interval_ms: u64,
}

impl QueueConfig {
    pub fn retry_interval(&self) -> Duration {
        Duration::from_millis(self.retry_interval_ms)
    }

    pub fn head_poll_interval(&self) -> Duration {
        Duration::from_millis(self.head_poll_interval_ms)
    }
}

fn default_worker_count() -> usize {
    8
}

fn default_retry_interval_ms() -> u64 {
    1000
}

fn default_head_poll_interval_ms() -> u64 {
    2000
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            worker_count: default_worker_count(),
            retry_interval_ms: default_retry_interval_ms(),
            head_poll_interval_ms: default_head_poll_interval_ms(),
        }
    }
}
