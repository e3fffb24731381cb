//! # Startup Sequence
//!
//! Boots the Mithril CMS core in the order the rest of the crate assumes:
//! observability first (so every later step logs), then the connection
//! pool (which bootstraps the system tables), then the Schema Engine
//! against the configured schema directory, then an optional admin
//! bootstrap, then the Audit Service's background drainer. The thin HTTP
//! layer that wires this into a router is out of scope for this crate; it
//! consumes the [`Application`] this module assembles.

use std::path::Path;

use tracing::{info, warn};

use crate::audit::AuditService;
use crate::auth::AuthService;
use crate::auth::TokenService;
use crate::config::AppConfig;
use crate::errors::Result;
use crate::observability::init_observability;
use crate::repository::ContentRepository;
use crate::schema::engine::RefreshOutcome;
use crate::schema::SchemaEngine;
use crate::storage::{create_pool, DbPool};

/// Every long-lived component the core hands to whatever assembles the
/// HTTP layer: a connection pool, the schema registry, and the auth/audit
/// services built on top of it.
#[derive(Clone)]
pub struct Application {
    pub pool: DbPool,
    pub config: AppConfig,
    pub schema: SchemaEngine,
    pub content: ContentRepository,
    pub auth: AuthService,
    pub audit: AuditService,
}

/// Run the full startup sequence and return the assembled [`Application`].
/// Fails fast on the first step that errors — a broken schema directory or
/// an unreachable database must never produce a half-initialized service.
pub async fn bootstrap(config: AppConfig) -> Result<Application> {
    init_observability(&config.observability)?;
    info!("starting mithril-cms");

    let pool = create_pool(&config.database).await?;

    let schema = SchemaEngine::new(pool.clone());
    let schema_dir = Path::new(&config.schema.directory);
    let outcome = refresh_schemas(&schema, schema_dir, config.schema.dev_mode).await?;
    info!(
        new_types = outcome.new_types.len(),
        updated_types = outcome.updated_types.len(),
        applied_changes = outcome.applied.len(),
        "schema refresh complete"
    );

    let tokens = TokenService::new(config.auth.jwt_secret.as_bytes(), config.auth.access_token_ttl_secs);
    let auth = AuthService::new(pool.clone(), tokens, config.auth.refresh_token_ttl_days);
    bootstrap_admin(&auth, &config).await?;

    let audit = AuditService::spawn(pool.clone(), config.audit.queue_capacity);
    let content = ContentRepository::new(pool.clone());

    Ok(Application { pool, config, schema, content, auth, audit })
}

/// Missing or empty schema directory is not fatal — an operator may add
/// content types after first boot and call `Refresh` again later.
async fn refresh_schemas(engine: &SchemaEngine, dir: &Path, dev_mode: bool) -> Result<RefreshOutcome> {
    if !dir.exists() {
        warn!(dir = %dir.display(), "schema directory does not exist, starting with no content types");
        return Ok(RefreshOutcome::default());
    }
    engine.refresh(dir, dev_mode).await
}

/// Creates the configured admin account if it doesn't already exist.
/// Skipped entirely unless both `bootstrap_admin_email` and
/// `bootstrap_admin_password` are set (spec.md §4.8).
async fn bootstrap_admin(auth: &AuthService, config: &AppConfig) -> Result<()> {
    let (Some(email), Some(password)) =
        (config.auth.bootstrap_admin_email.as_deref(), config.auth.bootstrap_admin_password.as_deref())
    else {
        return Ok(());
    };

    let admin = auth.ensure_admin(email, password).await?;
    info!(admin_id = %admin.id, email = %admin.email, "admin account bootstrapped");
    Ok(())
}

impl Application {
    /// Flush the audit queue and wait for the drainer to exit. Called on
    /// graceful shutdown; the caller decides how long to wait before
    /// proceeding with process exit regardless (spec.md §9).
    pub async fn shutdown(&self, audit_drain_timeout: std::time::Duration) {
        self.audit.shutdown(audit_drain_timeout).await;
    }
}
