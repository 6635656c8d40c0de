//! Client configuration

use std::time::Duration;

use url::Url;

use crate::error::{ClientError, Result};

/// Connection settings shared by the HTTP client and the subscriber
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Server root, e.g. `http://127.0.0.1:8088/`
    pub base_url: Url,
    /// Shared key sent as `x-api-key`; loopback clients can omit it
    pub api_key: Option<String>,
    /// Request timeout
    pub timeout: Duration,
    /// Connection timeout
    pub connect_timeout: Duration,
    pub user_agent: String,
}

impl ClientConfig {
    /// Parse the server root URL
    pub fn new(base_url: &str) -> Result<Self> {
        let base_url = Url::parse(base_url).map_err(|e| ClientError::InvalidUrl(e.to_string()))?;
        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(ClientError::InvalidUrl(format!(
                "unsupported scheme '{}'",
                base_url.scheme()
            )));
        }

        Ok(Self {
            base_url,
            api_key: None,
            timeout: Duration::from_secs(10),
            connect_timeout: Duration::from_secs(5),
            user_agent: format!("vmixlink-client/{}", env!("CARGO_PKG_VERSION")),
        })
    }

    /// Set the shared key
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Set timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// WebSocket endpoint on the same host and port
    pub fn websocket_url(&self) -> Result<Url> {
        let mut url = self.base_url.clone();
        let scheme = if url.scheme() == "https" { "wss" } else { "ws" };
        url.set_scheme(scheme)
            .map_err(|_| ClientError::InvalidUrl(self.base_url.to_string()))?;
        url.set_path("/ws");
        url.set_query(None);
        Ok(url)
    }
}
