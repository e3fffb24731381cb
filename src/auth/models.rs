//! # Auth Data Models
//!
//! Storage-facing representations of `Admin` and `RefreshToken`
//! (spec.md §3). Only the refresh token's hash is ever persisted — the
//! raw token exists only in memory on the response path.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Admin {
    pub id: Uuid,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct RefreshToken {
    pub id: Uuid,
    pub admin_id: Uuid,
    pub token_hash: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl RefreshToken {
    pub fn is_expired(&self) -> bool {
        self.expires_at <= Utc::now()
    }
}

/// Result of a successful login or refresh rotation: the caller gets the
/// raw refresh token exactly once, here, to set as a cookie (spec.md §6).
#[derive(Debug, Clone)]
pub struct IssuedSession {
    pub admin_id: Uuid,
    pub access_token: String,
    pub refresh_token: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn expired_token_is_detected() {
        let token = RefreshToken {
            id: Uuid::new_v4(),
            admin_id: Uuid::new_v4(),
            token_hash: "hash".to_string(),
            expires_at: Utc::now() - Duration::seconds(1),
            created_at: Utc::now() - Duration::days(7),
        };
        assert!(token.is_expired());
    }

    #[test]
    fn future_token_is_not_expired() {
        let token = RefreshToken {
            id: Uuid::new_v4(),
            admin_id: Uuid::new_v4(),
            token_hash: "hash".to_string(),
            expires_at: Utc::now() + Duration::days(7),
            created_at: Utc::now(),
        };
        assert!(!token.is_expired());
    }
}
