//! Shared integration-test infrastructure: an ephemeral Postgres container
//! with the five system tables bootstrapped, mirroring the teacher
//! codebase's `tests/common/test_db.rs` pattern.

#![allow(dead_code)]

use mithril_cms::config::DatabaseConfig;
use mithril_cms::storage::{create_pool, DbPool};
use testcontainers::runners::AsyncRunner;
use testcontainers::ContainerAsync;
use testcontainers_modules::postgres::Postgres;

pub struct TestDatabase {
    pub pool: DbPool,
    _container: ContainerAsync<Postgres>,
}

impl TestDatabase {
    /// Start a fresh PostgreSQL container and bootstrap the system tables
    /// (`content_types`, `admins`, `refresh_tokens`, `media`,
    /// `audit_log`) against it.
    pub async fn new(prefix: &str) -> Self {
        let container = Postgres::default()
            .start()
            .await
            .unwrap_or_else(|e| panic!("failed to start postgres container for {prefix}: {e}"));

        let host = container
            .get_host()
            .await
            .unwrap_or_else(|e| panic!("failed to get container host for {prefix}: {e}"));
        let port = container
            .get_host_port_ipv4(5432)
            .await
            .unwrap_or_else(|e| panic!("failed to get container port for {prefix}: {e}"));

        let url = format!("postgresql://postgres:postgres@{host}:{port}/postgres");

        let config = DatabaseConfig {
            url,
            max_connections: 5,
            min_connections: 1,
            connect_timeout_secs: 10,
            idle_timeout_secs: 0,
            auto_bootstrap: true,
        };

        let pool = create_pool(&config)
            .await
            .unwrap_or_else(|e| panic!("failed to create test pool for {prefix}: {e}"));

        Self { pool, _container: container }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}
