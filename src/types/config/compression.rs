//! Configuration for periodic balance compression.

use std::time::Duration;

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct CompressionConfig {
    /// Number of consecutive blocks folded into one compressed window.
    #[serde(default = "default_size")]
    pub size: u64,

    /// Seconds between checks for a fully populated window.
    #[serde(default = "default_check_interval_secs")]
    pub check_interval_secs: u64,
}

impl CompressionConfig {
    pub fn check_interval(&self) -> Duration {
        Duration::from_secs(self.check_interval_secs)
    }
}

fn default_size() -> u64 {
    1000
}

fn default_check_interval_secs() -> u64 {
    10
}

impl Default for CompressionConfig {
    fn default() -> Self {
        Self {
            size: default_size(),
            check_interval_secs: default_check_interval_secs(),
        }
    }
}
