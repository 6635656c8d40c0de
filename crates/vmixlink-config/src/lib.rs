//! vmixlink configuration
//!
//! Settings are layered: built-in defaults, then an optional TOML file, then
//! `VMIXLINK_*` environment variables, then explicit overrides (command line).

pub mod error;
pub mod loader;
pub mod types;

pub use error::{ConfigError, Result};
pub use loader::{ConfigLoader, ENV_PREFIX, LEGACY_API_KEY_VAR};
pub use types::ServerConfig;
