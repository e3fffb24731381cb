//! # Validation Engine
//!
//! Schema-driven payload validation (spec.md §4.6). Unlike compile-time
//! `#[derive(Validate)]` structs, content types are not known until the
//! schema directory is loaded, so validation here runs against the
//! in-memory [`crate::schema::ContentType`] at request time.

pub mod entry;

pub use entry::{validate_entry, FieldError};
