//! Container configuration.
//!
//! Settings come from defaults, environment variables (`CONTEXTUAL_DI_*`) or,
//! with the `config` feature, JSON.

use std::env;

#[cfg(feature = "config")]
use serde::{Deserialize, Serialize};

#[cfg(feature = "config")]
use crate::error::{DiError, DiResult};

/// Default environment variable prefix.
pub const ENV_PREFIX: &str = "CONTEXTUAL_DI";

/// Value read from a configuration source.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigValue {
    String(String),
    Integer(i64),
    Boolean(bool),
}

/// Source of configuration values.
pub trait ConfigSource: Send + Sync {
    /// Value for `key`, if the source has one.
    fn get(&self, key: &str) -> Option<ConfigValue>;
}

/// Reads `PREFIX_KEY` environment variables.
#[derive(Debug, Clone)]
pub struct EnvironmentConfigSource {
    prefix: String,
}

impl EnvironmentConfigSource {
    pub fn new() -> Self {
        Self::with_prefix(ENV_PREFIX)
    }

    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self { prefix: prefix.into() }
    }
}

impl Default for EnvironmentConfigSource {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigSource for EnvironmentConfigSource {
    fn get(&self, key: &str) -> Option<ConfigValue> {
        let env_key = format!("{}_{}", self.prefix.to_uppercase(), key.to_uppercase());
        env::var(env_key).ok().map(|value| {
            if let Ok(int_val) = value.parse::<i64>() {
                ConfigValue::Integer(int_val)
            } else if let Ok(bool_val) = value.parse::<bool>() {
                ConfigValue::Boolean(bool_val)
            } else {
                ConfigValue::String(value)
            }
        })
    }
}

/// Settings of a [`Container`](crate::Container).
///
/// # Examples
///
/// ```
/// use contextual_di::{Container, ContainerConfig};
///
/// let config = ContainerConfig {
///     max_resolution_depth: 32,
///     ..ContainerConfig::default()
/// };
/// let container = Container::with_config(config);
/// assert_eq!(container.config().max_resolution_depth, 32);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "config", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config", serde(default))]
pub struct ContainerConfig {
    /// Nesting limit for resolutions before failing with `DepthExceeded`
    pub max_resolution_depth: usize,
    /// Attach a [`LoggingObserver`](crate::LoggingObserver) on construction
    pub log_resolutions: bool,
    /// Prefix of log lines written by that observer
    pub log_prefix: String,
}

impl Default for ContainerConfig {
    fn default() -> Self {
        Self {
            max_resolution_depth: 256,
            log_resolutions: false,
            log_prefix: "[contextual-di]".to_string(),
        }
    }
}

impl ContainerConfig {
    /// Overlays values found in `source` on the defaults.
    ///
    /// Keys: `max_resolution_depth`, `log_resolutions`, `log_prefix`.
    /// Values of the wrong type are ignored.
    pub fn load(source: &dyn ConfigSource) -> Self {
        let mut config = Self::default();
        if let Some(ConfigValue::Integer(depth)) = source.get("max_resolution_depth") {
            if depth > 0 {
                config.max_resolution_depth = depth as usize;
            }
        }
        if let Some(ConfigValue::Boolean(log)) = source.get("log_resolutions") {
            config.log_resolutions = log;
        }
        match source.get("log_prefix") {
            Some(ConfigValue::String(prefix)) => config.log_prefix = prefix,
            Some(ConfigValue::Integer(n)) => config.log_prefix = n.to_string(),
            _ => {}
        }
        config
    }

    /// Reads `CONTEXTUAL_DI_*` environment variables.
    pub fn from_env() -> Self {
        Self::load(&EnvironmentConfigSource::new())
    }

    /// Reads `{prefix}_*` environment variables.
    pub fn from_env_with_prefix(prefix: &str) -> Self {
        Self::load(&EnvironmentConfigSource::with_prefix(prefix))
    }

    /// Parses a JSON object; missing fields keep their defaults.
    #[cfg(feature = "config")]
    pub fn from_json_str(json: &str) -> DiResult<Self> {
        serde_json::from_str(json).map_err(|e| DiError::Declaration(format!("invalid container config: {}", e)))
    }

    /// Serializes the configuration as JSON.
    #[cfg(feature = "config")]
    pub fn to_json_string(&self) -> DiResult<String> {
        serde_json::to_string(self).map_err(|e| DiError::Declaration(format!("invalid container config: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn environment_overrides_defaults() {
        env::set_var("CONTEXTUAL_DI_MAX_RESOLUTION_DEPTH", "12");
        env::set_var("CONTEXTUAL_DI_LOG_RESOLUTIONS", "true");

        let config = ContainerConfig::from_env();
        assert_eq!(config.max_resolution_depth, 12);
        assert!(config.log_resolutions);
        assert_eq!(config.log_prefix, "[contextual-di]");

        env::remove_var("CONTEXTUAL_DI_MAX_RESOLUTION_DEPTH");
        env::remove_var("CONTEXTUAL_DI_LOG_RESOLUTIONS");
    }

    #[test]
    #[serial]
    fn custom_prefix_and_bad_values() {
        env::set_var("MYAPP_MAX_RESOLUTION_DEPTH", "lots");
        env::set_var("MYAPP_LOG_PREFIX", "[app]");

        let config = ContainerConfig::from_env_with_prefix("myapp");
        assert_eq!(config.max_resolution_depth, 256);
        assert_eq!(config.log_prefix, "[app]");

        env::remove_var("MYAPP_MAX_RESOLUTION_DEPTH");
        env::remove_var("MYAPP_LOG_PREFIX");
    }

    #[cfg(feature = "config")]
    #[test]
    fn json_fills_missing_fields_with_defaults() {
        let config = ContainerConfig::from_json_str(r#"{"log_resolutions": true}"#).unwrap();
        assert!(config.log_resolutions);
        assert_eq!(config.max_resolution_depth, 256);
        assert!(ContainerConfig::from_json_str("[1]").is_err());
    }
}
