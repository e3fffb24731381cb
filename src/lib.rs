//! # Mithril CMS
//!
//! Mithril is a schema-first headless CMS core: operators declare content
//! types as YAML, the Schema Engine materializes them as Postgres tables
//! and keeps them in sync, and the Content Repository serves typed CRUD,
//! full-text search, and publishing against whatever those tables turn
//! out to be.
//!
//! ## Architecture
//!
//! ```text
//! YAML schemas → Schema Engine → ct_<name> tables → Content Repository
//!                      ↓                                    ↓
//!              content_types registry              Validation Engine
//! ```
//!
//! Authentication, the audit log, configuration, and observability are
//! the ambient services every other module sits on top of. The HTTP
//! router, admin UI, and media storage layout are out of scope — this
//! crate is the core a thin web layer is built against.
//!
//! ## Core Components
//!
//! - **Schema Engine**: loads, validates, diffs, and applies content-type
//!   definitions as transactional Postgres DDL.
//! - **Content Repository**: parameterized list/get/insert/update/publish
//!   SQL against the schema-derived tables, with full-text search.
//! - **Auth Service**: Argon2id password hashing, HMAC-signed access
//!   tokens, atomic refresh-token rotation with replay detection.
//! - **Audit Service**: a bounded, non-blocking event pipeline recording
//!   significant actions.

pub mod audit;
pub mod auth;
pub mod config;
pub mod envelope;
pub mod errors;
pub mod observability;
pub mod repository;
pub mod schema;
pub mod startup;
pub mod storage;
pub mod validation;

pub use config::AppConfig;
pub use errors::{MithrilError, Result};
pub use startup::{bootstrap, Application};

/// Application version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name from Cargo.toml
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
