//! Client configuration.
//!
//! Values are layered: built-in defaults, then a TOML document, then
//! `HTEST_*` environment variables.
//!
//! ```toml
//! time_layout = "%Y-%m-%dT%H:%M:%S"
//!
//! [default_headers]
//! Accept = "application/json"
//! X-Request-ID = "suite"
//!
//! [log]
//! level = "debug"
//! ```

use crate::error::{HtestError, HtestResult};
use crate::logging::LogConfig;
use crate::value::DEFAULT_TIME_LAYOUT;
use indexmap::IndexMap;
use serde::Deserialize;
use std::path::Path;

/// Prefix for environment overrides.
pub const ENV_PREFIX: &str = "HTEST_";

/// Settings applied to every request and assertion made through a
/// [`Client`](crate::Client) built with [`Client::from_config`](crate::Client::from_config).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClientConfig {
    /// Headers added to every request, in insertion order.
    pub default_headers: IndexMap<String, String>,

    /// `chrono` layout used by `time` assertions when none is given.
    pub time_layout: String,

    /// Logging settings.
    pub log: LogConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            default_headers: IndexMap::new(),
            time_layout: DEFAULT_TIME_LAYOUT.to_string(),
            log: LogConfig::default(),
        }
    }
}

impl ClientConfig {
    /// Parses a TOML document; absent fields keep their defaults.
    pub fn from_toml_str(content: &str) -> HtestResult<Self> {
        toml::from_str(content)
            .map_err(|e| HtestError::Config(format!("failed to parse TOML configuration: {e}")))
    }

    /// Reads and parses a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> HtestResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            HtestError::Config(format!(
                "failed to read configuration file {}: {e}",
                path.display()
            ))
        })?;
        Self::from_toml_str(&content)
    }

    /// Defaults overridden by the process environment.
    pub fn from_env() -> HtestResult<Self> {
        Self::default().with_env()
    }

    /// Applies `HTEST_*` overrides from the process environment.
    pub fn with_env(self) -> HtestResult<Self> {
        self.with_vars(std::env::vars())
    }

    /// Applies `HTEST_*` overrides from `vars`; other keys are ignored.
    ///
    /// Recognized keys: `HTEST_TIME_LAYOUT`, `HTEST_LOG_LEVEL`,
    /// `HTEST_LOG_FORMAT` (`json` or `text`) and `HTEST_LOG_ENABLED`.
    pub fn with_vars<I, K, V>(mut self, vars: I) -> HtestResult<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        for (key, value) in vars {
            let key = key.as_ref();
            if let Some(name) = key.strip_prefix(ENV_PREFIX) {
                self.apply_env_var(key, name, value.as_ref())?;
            }
        }
        Ok(self)
    }

    /// Adds a default header.
    #[must_use]
    pub fn with_default_header(
        mut self,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.default_headers.insert(name.into(), value.into());
        self
    }

    fn apply_env_var(&mut self, key: &str, name: &str, value: &str) -> HtestResult<()> {
        match name {
            "TIME_LAYOUT" => self.time_layout = value.to_string(),
            "LOG_LEVEL" => self.log.level = value.to_string(),
            "LOG_FORMAT" => {
                self.log.json_format = match value.to_ascii_lowercase().as_str() {
                    "json" => true,
                    "text" | "pretty" => false,
                    _ => return Err(env_error(key, "expected 'json' or 'text'")),
                };
            }
            "LOG_ENABLED" => {
                self.log.enabled =
                    parse_bool(value).ok_or_else(|| env_error(key, "expected boolean"))?;
            }
            _ => tracing::debug!(key, "ignoring unknown environment override"),
        }
        Ok(())
    }
}

fn env_error(key: &str, reason: &str) -> HtestError {
    HtestError::Config(format!("failed to parse environment variable {key}: {reason}"))
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ClientConfig::default();
        assert!(config.default_headers.is_empty());
        assert_eq!(config.time_layout, DEFAULT_TIME_LAYOUT);
        assert_eq!(config.log, LogConfig::default());
    }

    #[test]
    fn test_from_toml_keeps_header_order() {
        let config = ClientConfig::from_toml_str(
            r#"
            time_layout = "%Y-%m-%dT%H:%M:%S"

            [default_headers]
            X-Second = "b"
            Accept = "application/json"

            [log]
            level = "debug"
            "#,
        )
        .unwrap();

        assert_eq!(config.time_layout, "%Y-%m-%dT%H:%M:%S");
        assert_eq!(
            config.default_headers.keys().collect::<Vec<_>>(),
            vec!["X-Second", "Accept"]
        );
        assert_eq!(config.log.level, "debug");
        assert!(config.log.enabled);
    }

    #[test]
    fn test_empty_toml_is_default() {
        assert_eq!(
            ClientConfig::from_toml_str("").unwrap(),
            ClientConfig::default()
        );
    }

    #[test]
    fn test_unknown_field_rejected() {
        let err = ClientConfig::from_toml_str("timeout = 3").unwrap_err();
        assert!(matches!(err, HtestError::Config(_)));
    }

    #[test]
    fn test_missing_file() {
        let err = ClientConfig::from_file("/nonexistent/htest.toml").unwrap_err();
        assert!(err.to_string().contains("failed to read configuration file"));
    }

    #[test]
    fn test_env_overrides() {
        let config = ClientConfig::default()
            .with_vars([
                ("HTEST_TIME_LAYOUT", "%d/%m/%Y"),
                ("HTEST_LOG_LEVEL", "trace"),
                ("HTEST_LOG_FORMAT", "JSON"),
                ("HTEST_LOG_ENABLED", "no"),
                ("PATH", "/usr/bin"),
            ])
            .unwrap();

        assert_eq!(config.time_layout, "%d/%m/%Y");
        assert_eq!(config.log.level, "trace");
        assert!(config.log.json_format);
        assert!(!config.log.enabled);
    }

    #[test]
    fn test_env_invalid_value() {
        let err = ClientConfig::default()
            .with_vars([("HTEST_LOG_ENABLED", "maybe")])
            .unwrap_err();
        assert!(err.to_string().contains("HTEST_LOG_ENABLED"));
    }

    #[test]
    fn test_with_default_header_overwrites() {
        let config = ClientConfig::default()
            .with_default_header("Accept", "text/plain")
            .with_default_header("Accept", "application/json");
        assert_eq!(config.default_headers.len(), 1);
        assert_eq!(config.default_headers["Accept"], "application/json");
    }
}
