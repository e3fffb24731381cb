//! # Structured Logging
//!
//! Installs a `tracing-subscriber` registry with an `EnvFilter` and either
//! a JSON or pretty formatter, selected by [`crate::config::ObservabilityConfig`]
//! (SPEC_FULL.md §4.11). Every `#[instrument]`-annotated function elsewhere
//! in this crate (schema apply, repository queries, auth flows, audit
//! drain) emits through this subscriber once installed.

use tracing_subscriber::{fmt, EnvFilter};

use crate::config::ObservabilityConfig;
use crate::errors::{MithrilError, Result};

/// Install the global `tracing` subscriber. A second call in the same
/// process returns an error rather than panicking, so tests that share a
/// process can ignore it.
pub fn init_tracing(config: &ObservabilityConfig) -> Result<()> {
    let filter = EnvFilter::try_new(&config.log_level)
        .map_err(|e| MithrilError::config(format!("invalid log level '{}': {}", config.log_level, e)))?;

    let result = if config.json_logging {
        fmt().with_env_filter(filter).json().with_target(true).try_init()
    } else {
        fmt().with_env_filter(filter).with_target(true).try_init()
    };

    result.map_err(|e| MithrilError::config(format!("tracing subscriber already installed: {}", e)))
}

/// Log the resolved, non-secret parts of configuration at startup.
pub fn log_config_info(config: &crate::config::AppConfig) {
    tracing::info!(
        server_address = %config.server.bind_address(),
        schema_directory = %config.schema.directory,
        schema_dev_mode = config.schema.dev_mode,
        audit_queue_capacity = config.audit.queue_capacity,
        log_level = %config.observability.log_level,
        "mithril-cms configuration loaded"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_log_level_is_a_config_error() {
        let config = ObservabilityConfig { log_level: "not a filter ][".to_string(), json_logging: false };
        assert!(init_tracing(&config).is_err());
    }

    #[test]
    fn log_config_info_does_not_panic() {
        log_config_info(&crate::config::AppConfig::default());
    }
}
