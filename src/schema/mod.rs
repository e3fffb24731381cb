//! # Schema Engine
//!
//! The schema-first core: load YAML content-type definitions, validate
//! them, diff them against the live database, and apply safe DDL
//! transactionally (spec.md §4.1–§4.5).

pub mod ddl;
pub mod diff;
pub mod engine;
pub mod loader;
pub mod model;
pub mod validator;

pub use diff::{Change, ChangeType};
pub use engine::{ApplyOutcome, RefreshOutcome, SchemaEngine};
pub use loader::load_schemas;
pub use model::{ContentType, Field, FieldType, RelationType};
pub use validator::validate_schemas;
