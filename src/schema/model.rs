//! # Schema Model
//!
//! Canonical in-memory description of content types and fields
//! (spec.md §3), plus the identifier-quoting helpers every other schema
//! module builds SQL through.

use serde::{Deserialize, Serialize};

/// System columns present on every content table (spec.md §3). Field names
/// may never collide with these.
pub const SYSTEM_COLUMNS: &[&str] = &[
    "id",
    "status",
    "search_vector",
    "created_by",
    "updated_by",
    "created_at",
    "updated_at",
    "published_at",
];

/// Prefix every content-type table carries. Content-type names may never
/// start with this themselves (spec.md §3).
pub const TABLE_PREFIX: &str = "ct_";

/// Maximum length of a content-type `name`, reserving `ct_` under the
/// 63-byte Postgres identifier limit.
pub const MAX_CONTENT_TYPE_NAME_LEN: usize = 59;

/// Maximum length of a field `name`.
pub const MAX_FIELD_NAME_LEN: usize = 63;

/// A schema-declared content type (spec.md §3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ContentType {
    pub name: String,
    pub display_name: String,
    #[serde(default)]
    pub public_read: bool,
    #[serde(default)]
    pub fields: Vec<Field>,

    /// Lowercase hex SHA-256 of the raw YAML source. Not part of the YAML
    /// file itself — populated by the loader.
    #[serde(skip)]
    pub schema_hash: String,
}

impl ContentType {
    /// The table name this content type materializes as: `ct_<name>`.
    pub fn table_name(&self) -> String {
        format!("{}{}", TABLE_PREFIX, self.name)
    }

    /// Fields that appear as a real column on the table (i.e. everything
    /// except `relation_type: many`, which becomes a junction table).
    pub fn column_fields(&self) -> impl Iterator<Item = &Field> {
        self.fields.iter().filter(|f| !f.is_relation_many())
    }

    pub fn searchable_fields(&self) -> impl Iterator<Item = &Field> {
        self.fields.iter().filter(|f| f.searchable)
    }

    pub fn has_searchable_fields(&self) -> bool {
        self.fields.iter().any(|f| f.searchable)
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// A field declared on a content type (spec.md §3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Field {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub unique: bool,
    #[serde(default)]
    pub searchable: bool,
    #[serde(default)]
    pub min_length: Option<u32>,
    #[serde(default)]
    pub max_length: Option<u32>,
    #[serde(default)]
    pub min: Option<f64>,
    #[serde(default)]
    pub max: Option<f64>,
    #[serde(default)]
    pub regex: Option<String>,
    #[serde(default)]
    pub values: Option<Vec<String>>,
    #[serde(default)]
    pub relates_to: Option<String>,
    #[serde(default)]
    pub relation_type: Option<RelationType>,
}

impl Field {
    pub fn is_relation_many(&self) -> bool {
        self.field_type == FieldType::Relation && self.relation_type == Some(RelationType::Many)
    }

    pub fn is_relation_one(&self) -> bool {
        self.field_type == FieldType::Relation && self.relation_type == Some(RelationType::One)
    }

    pub fn is_textual(&self) -> bool {
        matches!(self.field_type, FieldType::String | FieldType::Text | FieldType::Richtext | FieldType::Enum)
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self.field_type, FieldType::Int | FieldType::Float)
    }

    /// The junction table name for a `relation_type: many` field:
    /// `ct_<source>_<field>_rel`.
    pub fn junction_table_name(&self, source_content_type: &str) -> String {
        format!("{}{}_{}_rel", TABLE_PREFIX, source_content_type, self.name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    String,
    Text,
    Richtext,
    Int,
    Float,
    Boolean,
    Date,
    Time,
    Enum,
    Json,
    Media,
    Relation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelationType {
    One,
    Many,
}

/// Double-quote an identifier for use in generated SQL, doubling any
/// embedded quote (spec.md §4.3, §9: "identifier safety is defense in
/// depth"). This must be applied to every identifier the DDL Generator,
/// Diff Engine, and Content Repository emit.
pub fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

/// Single-quote a string literal for use inside a CHECK constraint,
/// doubling any embedded quote. Only ever used for `enum` `values[]`
/// literals, which are schema-authored, not user-supplied at request time.
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}
