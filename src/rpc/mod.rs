mod client;
mod error;
mod retry;
mod types;

pub use client::{RpcClient, RpcClientConfig};
pub use error::RpcError;
pub use retry::RetryConfig;
