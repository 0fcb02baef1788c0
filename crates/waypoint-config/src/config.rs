//! The root configuration type.

use regex::Regex;
use serde::{Deserialize, Serialize};
use waypoint_telemetry::logging::create_env_filter;

use crate::{ConfigError, LoggingConfig, RoutingConfig};

/// Complete router configuration.
///
/// # Example
///
/// ```
/// use waypoint_config::RouterConfig;
///
/// let config = RouterConfig::default();
/// assert!(config.routing.base_prefix.is_empty());
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RouterConfig {
    /// Routing configuration.
    #[serde(default)]
    pub routing: RoutingConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl RouterConfig {
    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] if:
    /// - the base prefix contains `{`, `[` or `?`
    /// - a constraint alias is empty or its regex does not compile
    /// - the log level is not a valid filter directive
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self
            .routing
            .base_prefix
            .contains(|c| matches!(c, '{' | '}' | '[' | ']' | '?' | '#'))
        {
            return Err(ConfigError::invalid_value(
                "routing.base_prefix",
                format!("must be a literal path: {}", self.routing.base_prefix),
            ));
        }

        for (alias, regex) in &self.routing.patterns {
            if alias.is_empty() || alias.contains(|c: char| c == '{' || c == '}' || c == ':') {
                return Err(ConfigError::invalid_value(
                    "routing.patterns",
                    format!("invalid alias name `{alias}`"),
                ));
            }
            Regex::new(regex).map_err(|e| {
                ConfigError::invalid_value(format!("routing.patterns.{alias}"), e.to_string())
            })?;
        }

        if self.logging.enabled {
            create_env_filter(&self.logging.level)
                .map_err(|e| ConfigError::invalid_value("logging.level", e.to_string()))?;
        }

        Ok(())
    }

    /// Preset for local development: pretty debug logs.
    #[must_use]
    pub fn development() -> Self {
        let mut config = Self::default();
        config.logging.level = "debug".to_string();
        config.logging.format = crate::LogFormat::Pretty;
        config
    }
}
