//! # Authentication Core
//!
//! Password hashing, access token issuance/validation, and the
//! [`service::AuthService`] orchestrator for login, refresh rotation, logout,
//! and admin bootstrap (spec.md §4.8).

pub mod hashing;
pub mod jwt;
pub mod models;
pub mod service;

pub use jwt::{Claims, TokenService};
pub use models::{Admin, IssuedSession, RefreshToken};
pub use service::AuthService;
