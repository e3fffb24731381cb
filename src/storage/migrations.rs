//! # Storage Bootstrap
//!
//! Creates the five system registry tables from spec.md §6
//! (`content_types`, `admins`, `refresh_tokens`, `media`, `audit_log`) if
//! they don't already exist (SPEC_FULL.md §4.12). This is deliberately
//! *not* a general migration-file embedding framework — spec.md §1 puts
//! that mechanism out of scope — it is a fixed, idempotent bootstrap the
//! Schema Engine needs before it can read or write `content_types`.

use sqlx::PgPool;
use tracing::info;

use crate::errors::Result;

const CREATE_CONTENT_TYPES: &str = r#"
CREATE TABLE IF NOT EXISTS content_types (
    name TEXT PRIMARY KEY,
    display_name TEXT NOT NULL,
    public_read BOOLEAN NOT NULL DEFAULT false,
    fields JSONB NOT NULL DEFAULT '[]'::jsonb,
    schema_hash TEXT NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
)
"#;

const CREATE_ADMINS: &str = r#"
CREATE TABLE IF NOT EXISTS admins (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    email TEXT NOT NULL UNIQUE,
    password_hash TEXT NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
)
"#;

const CREATE_REFRESH_TOKENS: &str = r#"
CREATE TABLE IF NOT EXISTS refresh_tokens (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    admin_id UUID NOT NULL REFERENCES admins(id) ON DELETE CASCADE,
    token_hash TEXT NOT NULL UNIQUE,
    expires_at TIMESTAMPTZ NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
)
"#;

const CREATE_REFRESH_TOKENS_ADMIN_IDX: &str =
    "CREATE INDEX IF NOT EXISTS idx_refresh_tokens_admin_id ON refresh_tokens (admin_id)";

const CREATE_MEDIA: &str = r#"
CREATE TABLE IF NOT EXISTS media (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    filename TEXT NOT NULL UNIQUE,
    original_name TEXT NOT NULL,
    mime_type TEXT NOT NULL,
    size BIGINT NOT NULL,
    width INTEGER,
    height INTEGER,
    variants JSONB NOT NULL DEFAULT '{}'::jsonb,
    uploaded_by UUID REFERENCES admins(id) ON DELETE SET NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
)
"#;

const CREATE_AUDIT_LOG: &str = r#"
CREATE TABLE IF NOT EXISTS audit_log (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    action TEXT NOT NULL,
    actor_id UUID REFERENCES admins(id) ON DELETE SET NULL,
    resource TEXT,
    resource_id TEXT,
    payload JSONB,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
)
"#;

const CREATE_AUDIT_LOG_INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_audit_log_created_at ON audit_log (created_at DESC)",
    "CREATE INDEX IF NOT EXISTS idx_audit_log_action ON audit_log (action)",
    "CREATE INDEX IF NOT EXISTS idx_audit_log_resource ON audit_log (resource)",
];

/// Idempotently create the five system tables. Safe to call on every
/// startup: every statement is `CREATE TABLE IF NOT EXISTS` / `CREATE
/// INDEX IF NOT EXISTS`.
pub async fn ensure_system_tables(pool: &PgPool) -> Result<()> {
    sqlx::query("CREATE EXTENSION IF NOT EXISTS pgcrypto").execute(pool).await?;

    sqlx::query(CREATE_CONTENT_TYPES).execute(pool).await?;
    sqlx::query(CREATE_ADMINS).execute(pool).await?;
    sqlx::query(CREATE_REFRESH_TOKENS).execute(pool).await?;
    sqlx::query(CREATE_REFRESH_TOKENS_ADMIN_IDX).execute(pool).await?;
    sqlx::query(CREATE_MEDIA).execute(pool).await?;
    sqlx::query(CREATE_AUDIT_LOG).execute(pool).await?;
    for stmt in CREATE_AUDIT_LOG_INDEXES {
        sqlx::query(stmt).execute(pool).await?;
    }

    info!("system tables ensured (content_types, admins, refresh_tokens, media, audit_log)");
    Ok(())
}
