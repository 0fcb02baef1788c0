//! Configuration sections.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use waypoint_telemetry::LogConfig;

/// Strategy used by routes that do not set one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DefaultStrategy {
    /// HTML application responses.
    #[default]
    App,
    /// JSON API responses, with automatic `OPTIONS` routes.
    Json,
}

/// Routing section.
///
/// ```toml
/// [routing]
/// base_prefix = "/app"
/// default_strategy = "json"
/// options_routes = true
///
/// [routing.patterns]
/// year = "[0-9]{4}"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RoutingConfig {
    /// Prefix stripped from request paths and prepended to generated URLs.
    #[serde(default)]
    pub base_prefix: String,

    /// Strategy for routes without their own.
    #[serde(default)]
    pub default_strategy: DefaultStrategy,

    /// Whether the JSON strategy adds `OPTIONS` routes.
    #[serde(default = "default_true")]
    pub options_routes: bool,

    /// Extra constraint aliases, `alias = "regex"`.
    #[serde(default)]
    pub patterns: IndexMap<String, String>,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            base_prefix: String::new(),
            default_strategy: DefaultStrategy::App,
            options_routes: true,
            patterns: IndexMap::new(),
        }
    }
}

impl RoutingConfig {
    /// Returns the base prefix as `/x`, or empty.
    #[must_use]
    pub fn normalized_prefix(&self) -> String {
        let trimmed = self.base_prefix.trim_matches('/');
        if trimmed.is_empty() {
            String::new()
        } else {
            format!("/{trimmed}")
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// One JSON object per event.
    #[default]
    Json,
    /// Human-readable multi-line output.
    Pretty,
}

/// Logging section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Whether logging is enabled.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Filter directive.
    #[serde(default = "default_level")]
    pub level: String,

    /// Output format.
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            level: default_level(),
            format: LogFormat::Json,
        }
    }
}

impl LoggingConfig {
    /// Converts to the telemetry crate's logging configuration.
    #[must_use]
    pub fn to_log_config(&self) -> LogConfig {
        LogConfig {
            enabled: self.enabled,
            level: self.level.clone(),
            json_format: self.format == LogFormat::Json,
            ..LogConfig::default()
        }
    }
}

const fn default_true() -> bool {
    true
}

fn default_level() -> String {
    "info".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalized_prefix() {
        let mut routing = RoutingConfig::default();
        assert_eq!(routing.normalized_prefix(), "");
        routing.base_prefix = "app/".to_string();
        assert_eq!(routing.normalized_prefix(), "/app");
        routing.base_prefix = "/".to_string();
        assert_eq!(routing.normalized_prefix(), "");
    }

    #[test]
    fn test_to_log_config() {
        let logging = LoggingConfig {
            format: LogFormat::Pretty,
            level: "debug".to_string(),
            ..LoggingConfig::default()
        };
        let log = logging.to_log_config();
        assert!(!log.json_format);
        assert_eq!(log.level, "debug");
    }
}
