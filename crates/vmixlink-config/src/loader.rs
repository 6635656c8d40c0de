//! Layered configuration loading

use std::collections::HashMap;
use std::path::PathBuf;

use config::{Config, Environment, File, FileFormat};
use tracing::debug;

use crate::error::Result;
use crate::types::ServerConfig;

/// Prefix of configuration environment variables (`VMIXLINK_PORT`, ...)
pub const ENV_PREFIX: &str = "VMIXLINK";

/// Older variable carrying the shared API key
pub const LEGACY_API_KEY_VAR: &str = "VMIX_API_KEY";

/// Builds a [`ServerConfig`] from file, environment and overrides
#[derive(Debug, Default)]
pub struct ConfigLoader {
    config_path: Option<PathBuf>,
    env: Option<HashMap<String, String>>,
    overrides: Vec<(String, String)>,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read an optional TOML file; a missing file is not an error
    pub fn with_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_path = Some(path.into());
        self
    }

    /// Use the given variables instead of the process environment
    pub fn with_env(mut self, vars: HashMap<String, String>) -> Self {
        self.env = Some(vars);
        self
    }

    /// Set a key after every other source has been applied
    pub fn with_override(mut self, key: &str, value: impl ToString) -> Self {
        self.overrides.push((key.to_string(), value.to_string()));
        self
    }

    /// Load and validate
    pub fn load(self) -> Result<ServerConfig> {
        let mut builder = Config::builder();

        if let Some(path) = &self.config_path {
            debug!("Loading configuration from {}", path.display());
            builder = builder.add_source(File::from(path.clone()).format(FileFormat::Toml).required(false));
        }

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true)
                .source(self.env.clone()),
        );

        if let Some(key) = self.legacy_api_key() {
            builder = builder.set_override("api_key", key)?;
        }

        for (key, value) in &self.overrides {
            builder = builder.set_override(key.as_str(), value.as_str())?;
        }

        let config: ServerConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// The legacy key, unless `VMIXLINK_API_KEY` is set
    fn legacy_api_key(&self) -> Option<String> {
        let current = format!("{ENV_PREFIX}_API_KEY");
        if self.env_var(&current).is_some() {
            return None;
        }
        self.env_var(LEGACY_API_KEY_VAR).filter(|v| !v.is_empty())
    }

    fn env_var(&self, name: &str) -> Option<String> {
        match &self.env {
            Some(vars) => vars.get(name).cloned(),
            None => std::env::var(name).ok(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_load_without_sources_gives_defaults() {
        let config = ConfigLoader::new().with_env(HashMap::new()).load().unwrap();
        assert_eq!(config, ServerConfig::default());
    }

    #[test]
    fn test_environment_overrides_defaults() {
        let config = ConfigLoader::new()
            .with_env(vars(&[("VMIXLINK_PORT", "9000"), ("VMIXLINK_CACHE_TTL_MS", "1000")]))
            .load()
            .unwrap();
        assert_eq!(config.port, 9000);
        assert_eq!(config.cache_ttl_ms, 1000);
    }

    #[test]
    fn test_legacy_api_key_variable() {
        let config = ConfigLoader::new()
            .with_env(vars(&[("VMIX_API_KEY", "secret")]))
            .load()
            .unwrap();
        assert_eq!(config.api_key, "secret");
    }

    #[test]
    fn test_prefixed_api_key_beats_legacy_variable() {
        let config = ConfigLoader::new()
            .with_env(vars(&[("VMIX_API_KEY", "old"), ("VMIXLINK_API_KEY", "new")]))
            .load()
            .unwrap();
        assert_eq!(config.api_key, "new");
    }

    #[test]
    fn test_explicit_override_wins() {
        let config = ConfigLoader::new()
            .with_env(vars(&[("VMIXLINK_PORT", "9000")]))
            .with_override("port", 9100)
            .load()
            .unwrap();
        assert_eq!(config.port, 9100);
    }

    #[test]
    fn test_invalid_value_fails_validation() {
        let result = ConfigLoader::new()
            .with_env(vars(&[("VMIXLINK_BROADCAST_CAPACITY", "0")]))
            .load();
        assert!(result.is_err());
    }
}
