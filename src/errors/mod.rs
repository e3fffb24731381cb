//! # Error Handling
//!
//! Defines the error taxonomy used across the Mithril CMS core. Every
//! fallible operation in this crate returns [`Result<T>`], and every
//! variant knows the HTTP status code and machine-readable error code it
//! maps to (spec.md §7), so the thin HTTP glue in [`crate::envelope`] never
//! has to re-derive that mapping.

use serde::Serialize;

/// Result type for Mithril CMS operations.
pub type Result<T> = std::result::Result<T, MithrilError>;

/// A single field-level problem, used by `VALIDATION_ERROR` and
/// `BREAKING_CHANGES` responses (spec.md §6, §7).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorDetail {
    pub field: String,
    pub message: String,
}

impl ErrorDetail {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self { field: field.into(), message: message.into() }
    }
}

/// Main error type for the Mithril CMS core.
#[derive(thiserror::Error, Debug)]
pub enum MithrilError {
    /// One or more field constraints were violated on an ingress payload.
    #[error("validation failed: {} problem(s)", details.len())]
    Validation { details: Vec<ErrorDetail> },

    /// Request body was not valid JSON.
    #[error("invalid JSON: {0}")]
    InvalidJson(String),

    /// A path parameter (e.g. an entry id) was malformed.
    #[error("invalid id: {0}")]
    InvalidId(String),

    /// Query parameters (page, sort, filter keys, ...) were malformed or
    /// referenced a non-whitelisted field.
    #[error("invalid query parameters: {0}")]
    InvalidParams(String),

    /// Authentication failed or is missing.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// The requested resource does not exist, or is not publicly readable.
    #[error("not found: {0}")]
    NotFound(String),

    /// Schema refresh was blocked because it contained breaking changes and
    /// dev mode is off (spec.md §4.5).
    #[error("breaking changes blocked: {} change(s)", details.len())]
    BreakingChanges { details: Vec<ErrorDetail> },

    /// Request body was not JSON for a write method (spec.md §7).
    #[error("unsupported media type")]
    UnsupportedMediaType,

    /// Configuration could not be loaded or failed validation.
    #[error("configuration error: {0}")]
    Config(String),

    /// I/O failure (schema directory read, etc.).
    #[error("I/O error: {0}")]
    Io(String),

    /// Database error. The failing statement's identity (table/column) is
    /// logged by the caller before this is converted into `INTERNAL_ERROR`;
    /// the raw SQL and driver message never reach the client (spec.md §7).
    #[error("database error: {0}")]
    Database(String),

    /// Anything else unexpected.
    #[error("internal error: {0}")]
    Internal(String),
}

impl MithrilError {
    pub fn validation(details: Vec<ErrorDetail>) -> Self {
        Self::Validation { details }
    }

    pub fn validation_single(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation { details: vec![ErrorDetail::new(field, message)] }
    }

    pub fn not_found(resource_type: impl Into<String>, id: impl std::fmt::Display) -> Self {
        Self::NotFound(format!("{} '{}' not found", resource_type.into(), id))
    }

    pub fn breaking_changes(details: Vec<ErrorDetail>) -> Self {
        Self::BreakingChanges { details }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized(message.into())
    }

    /// Machine-readable error code for the JSON envelope (spec.md §6).
    pub fn code(&self) -> &'static str {
        match self {
            MithrilError::Validation { .. } => "VALIDATION_ERROR",
            MithrilError::InvalidJson(_) => "INVALID_JSON",
            MithrilError::InvalidId(_) => "INVALID_ID",
            MithrilError::InvalidParams(_) => "INVALID_PARAMS",
            MithrilError::Unauthorized(_) => "UNAUTHORIZED",
            MithrilError::NotFound(_) => "NOT_FOUND",
            MithrilError::BreakingChanges { .. } => "BREAKING_CHANGES",
            MithrilError::UnsupportedMediaType => "UNSUPPORTED_MEDIA_TYPE",
            MithrilError::Config(_)
            | MithrilError::Io(_)
            | MithrilError::Database(_)
            | MithrilError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// HTTP status code this error maps to (spec.md §7).
    pub fn status_code(&self) -> u16 {
        match self {
            MithrilError::Validation { .. }
            | MithrilError::InvalidJson(_)
            | MithrilError::InvalidId(_)
            | MithrilError::InvalidParams(_) => 400,
            MithrilError::Unauthorized(_) => 401,
            MithrilError::NotFound(_) => 404,
            MithrilError::BreakingChanges { .. } => 409,
            MithrilError::UnsupportedMediaType => 415,
            MithrilError::Config(_)
            | MithrilError::Io(_)
            | MithrilError::Database(_)
            | MithrilError::Internal(_) => 500,
        }
    }

    /// Field-level details to surface in `details[]`, if any.
    pub fn details(&self) -> Option<&[ErrorDetail]> {
        match self {
            MithrilError::Validation { details } | MithrilError::BreakingChanges { details } => {
                Some(details)
            }
            _ => None,
        }
    }
}

impl From<std::io::Error> for MithrilError {
    fn from(error: std::io::Error) -> Self {
        Self::Io(error.to_string())
    }
}

impl From<serde_json::Error> for MithrilError {
    fn from(error: serde_json::Error) -> Self {
        Self::InvalidJson(error.to_string())
    }
}

impl From<serde_yaml::Error> for MithrilError {
    fn from(error: serde_yaml::Error) -> Self {
        Self::Config(format!("parsing YAML: {}", error))
    }
}

impl From<config::ConfigError> for MithrilError {
    fn from(error: config::ConfigError) -> Self {
        Self::Config(error.to_string())
    }
}

impl From<validator::ValidationErrors> for MithrilError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let details = errors
            .field_errors()
            .iter()
            .flat_map(|(field, field_errors)| {
                field_errors.iter().map(move |e| {
                    ErrorDetail::new(
                        field.to_string(),
                        e.message
                            .as_ref()
                            .map_or_else(|| "invalid value".to_string(), |m| m.to_string()),
                    )
                })
            })
            .collect();
        Self::Validation { details }
    }
}

impl From<sqlx::Error> for MithrilError {
    fn from(error: sqlx::Error) -> Self {
        match error {
            sqlx::Error::RowNotFound => Self::NotFound("row not found".to_string()),
            other => Self::Database(other.to_string()),
        }
    }
}
