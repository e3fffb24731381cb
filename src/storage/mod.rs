//! # Storage Bootstrap
//!
//! Connection pool construction and bootstrap DDL for the system tables
//! the Schema Engine, Auth Service, and Audit Service depend on
//! (SPEC_FULL.md §4.12).

pub mod migrations;
pub mod pool;

pub use migrations::ensure_system_tables;
pub use pool::{check_connection, create_pool, get_pool_stats, DbPool, PoolStats};
