//! Shared infrastructure: configuration and retry policy.

mod config;
mod retry;

pub use config::{expand_path, CatalogConfig, Config, NetworkConfig, PluginsConfig, LOCAL_CONFIG_FILE};
pub use retry::{retry_if, RetryConfig, RetryResult};
