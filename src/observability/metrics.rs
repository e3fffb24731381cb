//! # Metrics
//!
//! Recorders for the counters SPEC_FULL.md §4.11 calls out explicitly:
//! audit events enqueued/dropped, schema applies by safety classification,
//! auth login outcomes, and refresh-token replay detections. These are
//! plain `metrics`-crate calls; exposing them (Prometheus endpoint, OTLP,
//! etc.) is left to the out-of-scope HTTP layer, the same separation of
//! "record here, expose elsewhere" this codebase uses throughout.

use metrics::counter;

/// Increment the audit-events-enqueued counter.
pub fn audit_enqueued() {
    counter!("mithril_audit_events_enqueued_total").increment(1);
}

/// Increment the audit-events-dropped counter (spec.md §7: the dropped
/// counter is the only signal a saturated audit queue gives the caller).
pub fn audit_dropped() {
    counter!("mithril_audit_events_dropped_total").increment(1);
}

/// Record a schema apply outcome, tagged by whether it was blocked by a
/// breaking change (spec.md §4.5).
pub fn schema_apply(safe: bool) {
    let label = if safe { "safe" } else { "breaking" };
    counter!("mithril_schema_applies_total", "classification" => label).increment(1);
}

/// Record a login attempt outcome (spec.md §4.8).
pub fn auth_login(success: bool) {
    let label = if success { "success" } else { "failure" };
    counter!("mithril_auth_login_total", "outcome" => label).increment(1);
}

/// Record a refresh-token replay detection (spec.md §4.8, §7): a stolen or
/// reused refresh token triggered full session revocation for its admin.
pub fn auth_refresh_replay_detected() {
    counter!("mithril_auth_refresh_replay_total").increment(1);
}
