//! # Audit Data Models
//!
//! The event shape `Log` accepts (spec.md §4.9) and the stored row /
//! query shapes the separate read path returns.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

/// An event to be recorded, as submitted to [`super::service::AuditService::log`].
/// Empty strings in `resource`/`resource_id` are normalized to `NULL` in
/// storage (spec.md §4.9).
#[derive(Debug, Clone)]
pub struct AuditEvent {
    pub action: String,
    pub actor_id: Option<Uuid>,
    pub resource: Option<String>,
    pub resource_id: Option<String>,
    pub payload: Option<Value>,
}

impl AuditEvent {
    pub fn new(action: impl Into<String>) -> Self {
        Self { action: action.into(), actor_id: None, resource: None, resource_id: None, payload: None }
    }

    pub fn with_actor(mut self, actor_id: Uuid) -> Self {
        self.actor_id = Some(actor_id);
        self
    }

    pub fn with_resource(mut self, resource: impl Into<String>, resource_id: impl Into<String>) -> Self {
        self.resource = Some(resource.into());
        self.resource_id = Some(resource_id.into());
        self
    }

    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = Some(payload);
        self
    }

    pub(super) fn normalized_resource(&self) -> Option<&str> {
        self.resource.as_deref().filter(|s| !s.is_empty())
    }

    pub(super) fn normalized_resource_id(&self) -> Option<&str> {
        self.resource_id.as_deref().filter(|s| !s.is_empty())
    }
}

/// A persisted audit log row.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct AuditEntry {
    pub id: Uuid,
    pub action: String,
    pub actor_id: Option<Uuid>,
    pub resource: Option<String>,
    pub resource_id: Option<String>,
    pub payload: Option<Value>,
    pub created_at: DateTime<Utc>,
}

/// Filter/pagination parameters for the `List` read path (spec.md §4.9):
/// exact match on `action` and/or `resource`, newest first.
#[derive(Debug, Clone, Default)]
pub struct AuditListQuery {
    pub action: Option<String>,
    pub resource: Option<String>,
    pub page: u32,
    pub per_page: u32,
}

impl AuditListQuery {
    pub fn normalized_page(&self) -> u32 {
        self.page.max(1)
    }

    pub fn normalized_per_page(&self) -> u32 {
        if self.per_page == 0 {
            20
        } else {
            self.per_page.clamp(1, 100)
        }
    }
}

#[derive(Debug, Clone)]
pub struct AuditListResult {
    pub total: i64,
    pub entries: Vec<AuditEntry>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_resource_normalizes_to_none() {
        let event = AuditEvent::new("entry.create").with_resource("", "");
        assert_eq!(event.normalized_resource(), None);
        assert_eq!(event.normalized_resource_id(), None);
    }

    #[test]
    fn non_empty_resource_is_preserved() {
        let event = AuditEvent::new("entry.create").with_resource("posts", "abc-123");
        assert_eq!(event.normalized_resource(), Some("posts"));
        assert_eq!(event.normalized_resource_id(), Some("abc-123"));
    }

    #[test]
    fn default_query_normalizes_page_and_per_page() {
        let query = AuditListQuery::default();
        assert_eq!(query.normalized_page(), 1);
        assert_eq!(query.normalized_per_page(), 20);
    }

    #[test]
    fn per_page_clamps_at_100() {
        let query = AuditListQuery { per_page: 500, ..Default::default() };
        assert_eq!(query.normalized_per_page(), 100);
    }
}
