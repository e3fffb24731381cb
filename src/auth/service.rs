//! # Auth Service
//!
//! Login, refresh rotation, logout, and admin bootstrap against the
//! `admins` / `refresh_tokens` system tables (spec.md §4.8).

use chrono::{Duration, Utc};
use rand::RngCore;
use sha2::{Digest, Sha256};
use sqlx::PgPool;
use tracing::{instrument, warn};

use crate::auth::hashing::{hash_password, validate_password_length, verify_password};
use crate::auth::jwt::TokenService;
use crate::auth::models::{Admin, IssuedSession};
use crate::errors::{MithrilError, Result};
use crate::observability::metrics;

const REFRESH_TOKEN_BYTES: usize = 32;

/// Orchestrates login, refresh rotation, logout, and admin bootstrap.
#[derive(Clone)]
pub struct AuthService {
    pool: PgPool,
    tokens: std::sync::Arc<TokenService>,
    refresh_token_ttl_days: i64,
}

fn generate_raw_refresh_token() -> String {
    let mut bytes = [0u8; REFRESH_TOKEN_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

fn hash_refresh_token(raw: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(raw.as_bytes());
    hex::encode(hasher.finalize())
}

impl AuthService {
    pub fn new(pool: PgPool, tokens: TokenService, refresh_token_ttl_days: i64) -> Self {
        Self { pool, tokens: std::sync::Arc::new(tokens), refresh_token_ttl_days }
    }

    /// `Login(email, pw)` (spec.md §4.8). Looks up the admin, verifies the
    /// password, and on success issues a fresh access token plus a new
    /// refresh token row.
    ///
    /// The lookup always runs before the password compare so a nonexistent
    /// email and a wrong password follow the same code path; the only
    /// timing variance left is Argon2's own cost, which the spec accepts.
    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<IssuedSession> {
        let admin = sqlx::query_as::<_, Admin>(
            "SELECT id, email, password_hash, created_at FROM admins WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        // A dummy hash so that a missing-admin lookup still pays Argon2's
        // cost before failing, keeping the two failure paths close in shape.
        const DUMMY_HASH: &str =
            "$argon2id$v=19$m=19456,t=2,p=1$c29tZXNhbHRzb21lc2FsdA$AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA";

        let (admin, password_ok) = match admin {
            Some(admin) => {
                let ok = verify_password(password, &admin.password_hash)?;
                (Some(admin), ok)
            }
            None => {
                let _ = verify_password(password, DUMMY_HASH);
                (None, false)
            }
        };

        let Some(admin) = admin.filter(|_| password_ok) else {
            metrics::auth_login(false);
            return Err(MithrilError::unauthorized("invalid credentials"));
        };

        let access_token = self.tokens.issue(&admin.id.to_string(), &admin.email)?;
        let raw_refresh = generate_raw_refresh_token();
        let token_hash = hash_refresh_token(&raw_refresh);
        let expires_at = Utc::now() + Duration::days(self.refresh_token_ttl_days);

        sqlx::query(
            "INSERT INTO refresh_tokens (admin_id, token_hash, expires_at) VALUES ($1, $2, $3)",
        )
        .bind(admin.id)
        .bind(&token_hash)
        .bind(expires_at)
        .execute(&self.pool)
        .await?;

        metrics::auth_login(true);
        Ok(IssuedSession { admin_id: admin.id, access_token, refresh_token: raw_refresh })
    }

    /// `Refresh(raw_refresh)` (spec.md §4.8). Atomically consumes the old
    /// refresh token and issues a new one. A concurrent attempt to consume
    /// the same token sees zero rows affected by the `DELETE` and is treated
    /// as a replay: every session for that admin is revoked.
    #[instrument(skip(self, raw_refresh))]
    pub async fn refresh(&self, raw_refresh: &str) -> Result<IssuedSession> {
        let token_hash = hash_refresh_token(raw_refresh);

        let row = sqlx::query_as::<_, (uuid::Uuid, uuid::Uuid, chrono::DateTime<Utc>)>(
            "SELECT id, admin_id, expires_at FROM refresh_tokens WHERE token_hash = $1",
        )
        .bind(&token_hash)
        .fetch_optional(&self.pool)
        .await?;

        let Some((_id, admin_id, expires_at)) = row else {
            return Err(MithrilError::unauthorized("invalid refresh token"));
        };

        if expires_at <= Utc::now() {
            sqlx::query("DELETE FROM refresh_tokens WHERE token_hash = $1")
                .bind(&token_hash)
                .execute(&self.pool)
                .await?;
            return Err(MithrilError::unauthorized("refresh token expired"));
        }

        let admin = sqlx::query_as::<_, Admin>(
            "SELECT id, email, password_hash, created_at FROM admins WHERE id = $1",
        )
        .bind(admin_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| MithrilError::unauthorized("admin no longer exists"))?;

        let new_raw = generate_raw_refresh_token();
        let new_hash = hash_refresh_token(&new_raw);
        let new_expires_at = Utc::now() + Duration::days(self.refresh_token_ttl_days);

        let mut tx = self.pool.begin().await?;

        let consumed = sqlx::query(
            "DELETE FROM refresh_tokens WHERE token_hash = $1 AND admin_id = $2",
        )
        .bind(&token_hash)
        .bind(admin_id)
        .execute(&mut *tx)
        .await?;

        if consumed.rows_affected() == 0 {
            tx.rollback().await?;
            sqlx::query("DELETE FROM refresh_tokens WHERE admin_id = $1")
                .bind(admin_id)
                .execute(&self.pool)
                .await?;
            metrics::auth_refresh_replay_detected();
            warn!(admin_id = %admin_id, "refresh token replay detected, revoking all sessions");
            return Err(MithrilError::unauthorized("refresh token already used"));
        }

        sqlx::query(
            "INSERT INTO refresh_tokens (admin_id, token_hash, expires_at) VALUES ($1, $2, $3)",
        )
        .bind(admin_id)
        .bind(&new_hash)
        .bind(new_expires_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        let access_token = self.tokens.issue(&admin.id.to_string(), &admin.email)?;
        Ok(IssuedSession { admin_id: admin.id, access_token, refresh_token: new_raw })
    }

    /// `Logout(raw)` (spec.md §4.8). Deleting a token that is already gone
    /// is not an error.
    #[instrument(skip(self, raw_refresh))]
    pub async fn logout(&self, raw_refresh: &str) -> Result<()> {
        let token_hash = hash_refresh_token(raw_refresh);
        sqlx::query("DELETE FROM refresh_tokens WHERE token_hash = $1")
            .bind(&token_hash)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// `EnsureAdmin(email, pw)` (spec.md §4.8). Uses `ON CONFLICT DO
    /// NOTHING RETURNING` so a concurrent bootstrap can't race a
    /// count-then-create check; if no row comes back, the admin already
    /// existed and is fetched instead.
    #[instrument(skip(self, password))]
    pub async fn ensure_admin(&self, email: &str, password: &str) -> Result<Admin> {
        validate_password_length(password)?;
        let password_hash = hash_password(password)?;

        let inserted = sqlx::query_as::<_, Admin>(
            "INSERT INTO admins (email, password_hash) VALUES ($1, $2) \
             ON CONFLICT (email) DO NOTHING \
             RETURNING id, email, password_hash, created_at",
        )
        .bind(email)
        .bind(&password_hash)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(admin) = inserted {
            return Ok(admin);
        }

        sqlx::query_as::<_, Admin>(
            "SELECT id, email, password_hash, created_at FROM admins WHERE email = $1",
        )
        .bind(email)
        .fetch_one(&self.pool)
        .await
        .map_err(Into::into)
    }
}
