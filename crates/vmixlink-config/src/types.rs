//! Server settings

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};

/// Shared key used when none is configured
pub const DEFAULT_API_KEY: &str = "vmix-default-api-key";

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    /// Interface to bind
    pub host: String,
    /// TCP port for HTTP and WebSocket traffic; 0 picks a free port
    pub port: u16,
    /// Directory holding `<profile>.json` files
    pub data_dir: PathBuf,
    /// Shared key required from non-loopback clients
    pub api_key: String,
    /// Lifetime of a cached rendering, in milliseconds
    pub cache_ttl_ms: u64,
    /// Interval between sweeps of expired cache entries, in seconds
    pub cache_purge_interval_secs: u64,
    /// Messages buffered per subscriber before it starts skipping
    pub broadcast_capacity: usize,
    /// Default log filter when `RUST_LOG` is unset
    pub log_level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8088,
            data_dir: Self::default_data_dir(),
            api_key: DEFAULT_API_KEY.to_string(),
            cache_ttl_ms: 300_000,
            cache_purge_interval_secs: 60,
            broadcast_capacity: 1024,
            log_level: "info".to_string(),
        }
    }
}

impl ServerConfig {
    /// Platform data directory plus `vmixlink/profiles`
    pub fn default_data_dir() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("vmixlink")
            .join("profiles")
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_millis(self.cache_ttl_ms)
    }

    pub fn cache_purge_interval(&self) -> Duration {
        Duration::from_secs(self.cache_purge_interval_secs)
    }

    /// `host:port` for logging
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Reject settings the server cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(ConfigError::Validation("Host must not be empty".to_string()));
        }
        if self.api_key.is_empty() {
            return Err(ConfigError::Validation(
                "API key must not be empty".to_string(),
            ));
        }
        if self.cache_ttl_ms == 0 {
            return Err(ConfigError::Validation(
                "Cache TTL must be greater than 0".to_string(),
            ));
        }
        if self.cache_purge_interval_secs == 0 {
            return Err(ConfigError::Validation(
                "Cache purge interval must be greater than 0".to_string(),
            ));
        }
        if self.broadcast_capacity == 0 {
            return Err(ConfigError::Validation(
                "Broadcast capacity must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}
