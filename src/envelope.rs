//! # Response Envelope
//!
//! The JSON envelope shapes consumed by the (out-of-scope) HTTP layer
//! (spec.md §6), plus the thin [`axum::response::IntoResponse`] mapping
//! from [`MithrilError`] to an HTTP response. This is the "glue" component
//! from spec.md §2 — it does not build a router or register routes.

use axum::{http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;
use tracing::error;

use crate::errors::{ErrorDetail, MithrilError};

/// `{ "data": <value> }`
#[derive(Debug, Serialize)]
pub struct DataEnvelope<T: Serialize> {
    pub data: T,
}

impl<T: Serialize> DataEnvelope<T> {
    pub fn new(data: T) -> Self {
        Self { data }
    }
}

/// Pagination metadata attached to list responses.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct PageMeta {
    pub page: u32,
    pub per_page: u32,
    pub total: i64,
    pub total_pages: i64,
}

impl PageMeta {
    pub fn new(page: u32, per_page: u32, total: i64) -> Self {
        let total_pages = if per_page == 0 { 0 } else { (total + per_page as i64 - 1) / per_page as i64 };
        Self { page, per_page, total, total_pages: total_pages.max(0) }
    }
}

/// `{ "data": [...], "meta": { ... } }`
#[derive(Debug, Serialize)]
pub struct PagedEnvelope<T: Serialize> {
    pub data: Vec<T>,
    pub meta: PageMeta,
}

impl<T: Serialize> PagedEnvelope<T> {
    pub fn new(data: Vec<T>, meta: PageMeta) -> Self {
        Self { data, meta }
    }
}

/// `{ "error": { "code", "message", "details"? } }`
#[derive(Debug, Serialize)]
pub struct ErrorEnvelope {
    pub error: ErrorBody,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<ErrorDetail>>,
}

impl IntoResponse for MithrilError {
    fn into_response(self) -> axum::response::Response {
        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let code = self.code();
        let details = self.details().map(|d| d.to_vec());

        // Database/Io/Config/Internal carry driver and filesystem detail
        // that must never reach the client (spec.md §7); log the real
        // error and respond with a fixed generic message instead.
        let message = match &self {
            MithrilError::Database(_) | MithrilError::Internal(_) | MithrilError::Io(_) | MithrilError::Config(_) => {
                error!(error = %self, "internal error");
                "an internal error occurred".to_string()
            }
            _ => self.to_string(),
        };

        (status, Json(ErrorEnvelope { error: ErrorBody { code, message, details } })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_meta_rounds_up() {
        let meta = PageMeta::new(1, 20, 41);
        assert_eq!(meta.total_pages, 3);
    }

    #[test]
    fn page_meta_zero_total() {
        let meta = PageMeta::new(1, 20, 0);
        assert_eq!(meta.total_pages, 0);
    }

    #[test]
    fn data_envelope_serializes_under_data_key() {
        let env = DataEnvelope::new(serde_json::json!({"id": "1"}));
        let v = serde_json::to_value(&env).unwrap();
        assert!(v.get("data").is_some());
    }
}
