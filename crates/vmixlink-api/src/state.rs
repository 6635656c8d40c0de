//! Application state for the API server

use std::sync::Arc;
use std::time::Instant;

use crate::commands::CommandClient;
use crate::service::ProfileService;

/// Application state shared across all API handlers
#[derive(Clone)]
pub struct AppState {
    /// Profile operations
    pub service: Arc<ProfileService>,
    /// Channel to the management command worker
    pub commands: CommandClient,
    /// Shared key required from non-loopback clients
    pub api_key: Arc<str>,
    /// Server start time for uptime calculation
    pub start_time: Instant,
}

impl AppState {
    pub fn new(service: Arc<ProfileService>, commands: CommandClient, api_key: impl Into<Arc<str>>) -> Self {
        Self {
            service,
            commands,
            api_key: api_key.into(),
            start_time: Instant::now(),
        }
    }

    /// Get server uptime in seconds
    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}
