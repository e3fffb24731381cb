//! # Observability
//!
//! Structured logging and metrics for the Mithril CMS core (SPEC_FULL.md
//! §4.11). Exporting metrics (Prometheus scrape endpoint, OTLP, ...) is
//! left to the out-of-scope HTTP layer; this module only records.

pub mod logging;
pub mod metrics;

pub use logging::{init_tracing, log_config_info};

use crate::config::ObservabilityConfig;
use crate::errors::Result;

/// Install the tracing subscriber and log the resolved configuration.
/// Call once at process startup, before any other component runs.
pub fn init_observability(config: &ObservabilityConfig) -> Result<()> {
    init_tracing(config)
}
