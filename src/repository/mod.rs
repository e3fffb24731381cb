//! # Content Repository
//!
//! SQL generation against the schema-materialized `ct_<name>` tables
//! (spec.md §4.7): [`content`] holds the CRUD/list operations, [`search`]
//! the pure clause-composition helpers it builds on.

pub mod content;
pub mod search;

pub use content::{ContentRepository, ListQuery, ListResult};
pub use search::SortDirection;
