//! Client for the vmixlink data server
//!
//! - [`ItemsClient`] talks to the HTTP API: polling data, item edits and
//!   whole-profile management.
//! - [`Subscriber`] holds a WebSocket subscription open, pings every 30
//!   seconds and reconnects with exponential backoff.

pub mod config;
pub mod error;
pub mod items;
pub mod reconnect;
pub mod subscriber;

pub use config::ClientConfig;
pub use error::{ClientError, Result};
pub use items::{FetchedData, ItemsClient};
pub use reconnect::ReconnectPolicy;
pub use subscriber::{ProfileUpdate, Subscriber};

/// Re-export commonly used types
pub use reqwest::StatusCode;
