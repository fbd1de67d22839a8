//! Log output for test runs.
//!
//! Everything this crate logs goes through `tracing`: dispatches at `debug`,
//! soft failures at `warn`, hard failures at `error`. Call [`init_logging`]
//! once per test binary to see them; output is routed through the libtest
//! capture so it only shows for failing tests.
//!
//! # Example
//!
//! ```rust,ignore
//! use htest::logging::{init_logging, LogConfig};
//!
//! init_logging(&LogConfig::development())?;
//! ```

use crate::error::{HtestError, HtestResult};
use serde::Deserialize;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Whether logging is enabled.
    pub enabled: bool,

    /// Filter directive (e.g. "warn", "htest=debug").
    pub level: String,

    /// Whether to output JSON instead of human-readable lines.
    pub json_format: bool,

    /// Whether to include span events (enter, exit, close).
    pub span_events: bool,

    /// Whether to include file/line info.
    pub file_line_info: bool,

    /// Whether to include target (module path).
    pub include_target: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            level: "warn".to_string(),
            json_format: false,
            span_events: false,
            file_line_info: false,
            include_target: true,
        }
    }
}

impl LogConfig {
    /// Verbose human-readable output, including every dispatch.
    #[must_use]
    pub fn development() -> Self {
        Self {
            level: "debug".to_string(),
            file_line_info: true,
            ..Self::default()
        }
    }

    /// Logging switched off.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }
}

/// Installs a global `tracing` subscriber for `config`.
///
/// A subscriber that is already installed (by an earlier test in the same
/// binary, or by the caller) is left in place and this returns `Ok`.
///
/// # Errors
///
/// Returns [`HtestError::Config`] if `config.level` is not a valid filter.
pub fn init_logging(config: &LogConfig) -> HtestResult<()> {
    if !config.enabled {
        return Ok(());
    }

    let filter = create_env_filter(&config.level)?;

    let span_events = if config.span_events {
        FmtSpan::NEW | FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };

    let layer = tracing_subscriber::fmt::layer()
        .with_test_writer()
        .with_span_events(span_events)
        .with_file(config.file_line_info)
        .with_line_number(config.file_line_info)
        .with_target(config.include_target);

    let result = if config.json_format {
        tracing_subscriber::registry()
            .with(layer.json().with_filter(filter))
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(layer.with_filter(filter))
            .try_init()
    };

    if let Err(e) = result {
        tracing::debug!(error = %e, "subscriber already installed");
    }
    Ok(())
}

/// Creates an env filter from a directive string.
///
/// # Errors
///
/// Returns [`HtestError::Config`] if the directive does not parse.
pub fn create_env_filter(filter: &str) -> HtestResult<EnvFilter> {
    EnvFilter::try_new(filter)
        .map_err(|e| HtestError::Config(format!("invalid log level '{filter}': {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = LogConfig::default();
        assert!(config.enabled);
        assert_eq!(config.level, "warn");
        assert!(!config.json_format);
    }

    #[test]
    fn test_development_config() {
        let config = LogConfig::development();
        assert_eq!(config.level, "debug");
        assert!(config.file_line_info);
    }

    #[test]
    fn test_disabled_is_noop() {
        assert!(init_logging(&LogConfig::disabled()).is_ok());
    }

    #[test]
    fn test_create_env_filter() {
        assert!(create_env_filter("info").is_ok());
        assert!(create_env_filter("htest=debug,hyper=warn").is_ok());
    }

    #[test]
    fn test_invalid_level() {
        let config = LogConfig {
            level: "htest=notalevel".to_string(),
            ..LogConfig::default()
        };
        assert!(matches!(init_logging(&config), Err(HtestError::Config(_))));
    }

    #[test]
    fn test_init_twice_is_ok() {
        assert!(init_logging(&LogConfig::default()).is_ok());
        assert!(init_logging(&LogConfig::development()).is_ok());
    }
}
