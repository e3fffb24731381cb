//! # Audit Service
//!
//! Asynchronous, bounded, drop-on-overflow logging of significant actions
//! (spec.md §4.9). `log` never blocks the request path; a single
//! background drainer persists events to `audit_log` and `shutdown`
//! always waits for it to finish.

pub mod models;
pub mod service;

pub use models::{AuditEntry, AuditEvent, AuditListQuery, AuditListResult};
pub use service::AuditService;
