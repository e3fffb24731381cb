//! # Search Clause Builder
//!
//! Pure SQL-fragment composition for full-text search and sort/pagination
//! (spec.md §4.7). No database access lives here; [`content`](super::content)
//! calls these to assemble its `WHERE`/`ORDER BY`/projection clauses.

use crate::errors::{MithrilError, Result};
use crate::schema::model::quote_ident;
use crate::schema::ContentType;

/// System columns a `List` call may sort by, in addition to schema fields
/// (spec.md §4.7).
pub const SYSTEM_SORTABLE_COLUMNS: &[&str] =
    &["id", "status", "created_at", "updated_at", "published_at", "created_by", "updated_by"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

/// Reject a caller-supplied sort field unless it names a declared schema
/// field or one of [`SYSTEM_SORTABLE_COLUMNS`]; this is what keeps an
/// arbitrary query-string value from being concatenated into `ORDER BY`.
pub fn validate_sort_field(schema: &ContentType, field: &str) -> Result<String> {
    if SYSTEM_SORTABLE_COLUMNS.contains(&field) || schema.field(field).is_some() {
        Ok(field.to_string())
    } else {
        Err(MithrilError::InvalidParams(format!("'{}' is not a sortable field", field)))
    }
}

/// `"search_vector" @@ plainto_tsquery('english', $n)`, for the `WHERE`
/// clause.
pub fn search_predicate(param_index: usize) -> String {
    format!("{} @@ plainto_tsquery('english', ${})", quote_ident("search_vector"), param_index)
}

/// `ts_rank(search_vector, plainto_tsquery('english', $n)) DESC`, prepended
/// to the `ORDER BY` list whenever a search term is active.
pub fn rank_order_clause(param_index: usize) -> String {
    format!(
        "ts_rank({}, plainto_tsquery('english', ${})) DESC",
        quote_ident("search_vector"),
        param_index
    )
}

/// `ts_headline('english', "<field>", plainto_tsquery('english', $n)) AS
/// "_search_headline"`, added to the projection when search is active and
/// the content type has at least one searchable field.
pub fn headline_projection(field: &str, param_index: usize) -> String {
    format!(
        "ts_headline('english', {}, plainto_tsquery('english', ${})) AS \"_search_headline\"",
        quote_ident(field),
        param_index
    )
}

/// The first declared searchable field, used as the headline source
/// (spec.md §4.7: "the first-searchable").
pub fn first_searchable_field(schema: &ContentType) -> Option<&str> {
    schema.searchable_fields().next().map(|f| f.name.as_str())
}
