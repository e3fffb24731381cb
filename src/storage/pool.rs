//! # Database Connection Pool
//!
//! Builds the `sqlx::PgPool` every other component shares (SPEC_FULL.md
//! §4.12). The Schema Engine's DDL (JSONB, GIN indexes, `tsvector`,
//! triggers) is Postgres-specific, so unlike the generic SQLite/Postgres
//! pool this crate is modeled on, only Postgres is supported here.

use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::PgPool;
use tracing::info;

use crate::config::DatabaseConfig;
use crate::errors::{MithrilError, Result};

/// Type alias for the database connection pool.
pub type DbPool = PgPool;

/// Build a `PgPool` from validated configuration. Connections are tested
/// before being handed to a caller; acquisition is bounded by
/// `connect_timeout_secs` (spec.md §5: initial DB connection 10s).
pub async fn create_pool(config: &DatabaseConfig) -> Result<PgPool> {
    let connect_options: PgConnectOptions = config
        .url
        .parse()
        .map_err(|e| MithrilError::config(format!("invalid database URL: {}", e)))?;

    let mut options = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(config.connect_timeout())
        .test_before_acquire(true);

    if let Some(idle_timeout) = config.idle_timeout() {
        options = options.idle_timeout(idle_timeout);
    }

    let pool = options.connect_with(connect_options).await.map_err(|e| {
        tracing::error!(error = %e, "failed to create database pool");
        MithrilError::Database(format!("failed to connect to database: {}", e))
    })?;

    info!(
        max_connections = config.max_connections,
        min_connections = config.min_connections,
        "database connection pool created"
    );

    if config.auto_bootstrap {
        crate::storage::migrations::ensure_system_tables(&pool).await?;
    }

    Ok(pool)
}

/// `SELECT 1` round-trip, used by the (out-of-scope) health endpoint and
/// by startup to fail fast on an unreachable database.
pub async fn check_connection(pool: &PgPool) -> Result<()> {
    sqlx::query("SELECT 1").fetch_one(pool).await?;
    Ok(())
}

/// Snapshot of pool occupancy, for the (out-of-scope) health endpoint.
#[derive(Debug, Clone, Copy)]
pub struct PoolStats {
    pub size: u32,
    pub idle: usize,
}

impl PoolStats {
    pub fn active(&self) -> u32 {
        self.size.saturating_sub(self.idle as u32)
    }

    pub fn is_healthy(&self) -> bool {
        self.size > 0
    }
}

pub fn get_pool_stats(pool: &PgPool) -> PoolStats {
    PoolStats { size: pool.size(), idle: pool.num_idle() }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_stats_active_is_size_minus_idle() {
        let stats = PoolStats { size: 10, idle: 3 };
        assert_eq!(stats.active(), 7);
        assert!(stats.is_healthy());
    }

    #[test]
    fn empty_pool_is_not_healthy() {
        let stats = PoolStats { size: 0, idle: 0 };
        assert!(!stats.is_healthy());
    }

    #[tokio::test]
    async fn invalid_url_is_a_config_error() {
        let config = DatabaseConfig {
            url: "not-a-postgres-url".to_string(),
            max_connections: 1,
            min_connections: 0,
            connect_timeout_secs: 1,
            idle_timeout_secs: 0,
            auto_bootstrap: false,
        };
        let result = create_pool(&config).await;
        assert!(result.is_err());
    }
}
