//! # Schema Validator
//!
//! Rejects ill-formed schemas, reporting every problem at once
//! (spec.md §4.2, §3). Validation is total: it never stops at the first
//! error.

use std::collections::HashSet;

use regex::Regex;

use crate::errors::{ErrorDetail, MithrilError, Result};
use crate::schema::model::{
    ContentType, Field, FieldType, RelationType, MAX_CONTENT_TYPE_NAME_LEN, MAX_FIELD_NAME_LEN,
    SYSTEM_COLUMNS, TABLE_PREFIX,
};

/// A conservative list of SQL-reserved keywords a content-type or field
/// name must never collide with (spec.md §3).
const RESERVED_KEYWORDS: &[&str] = &[
    "select", "insert", "update", "delete", "from", "where", "table", "column", "index", "user",
    "group", "order", "join", "primary", "foreign", "key", "references", "constraint", "default",
    "null", "create", "drop", "alter", "grant", "revoke", "union", "into", "values", "as", "and",
    "or", "not", "in", "is", "like", "between", "case", "when", "then", "else", "end",
];

static NAME_PATTERN: &str = r"^[a-z][a-z0-9_]*$";

/// Validate a loaded sequence of content types, returning every problem
/// found across every content type (spec.md §4.2).
pub fn validate_schemas(content_types: &[ContentType]) -> Result<()> {
    let mut details = Vec::new();
    let known_names: HashSet<&str> = content_types.iter().map(|ct| ct.name.as_str()).collect();
    let mut seen_names: HashSet<&str> = HashSet::new();
    let name_re = Regex::new(NAME_PATTERN).expect("static pattern compiles");

    for ct in content_types {
        if !seen_names.insert(ct.name.as_str()) {
            details.push(ErrorDetail::new(
                ct.name.clone(),
                format!("duplicate content type name '{}'", ct.name),
            ));
        }
        validate_content_type(ct, &known_names, &name_re, &mut details);
    }

    if details.is_empty() {
        Ok(())
    } else {
        Err(MithrilError::validation(details))
    }
}

fn validate_content_type(
    ct: &ContentType,
    known_names: &HashSet<&str>,
    name_re: &Regex,
    details: &mut Vec<ErrorDetail>,
) {
    let prefix = ct.name.clone();

    if !name_re.is_match(&ct.name) {
        details.push(ErrorDetail::new(
            prefix.clone(),
            "name must match ^[a-z][a-z0-9_]*$".to_string(),
        ));
    }
    if ct.name.len() > MAX_CONTENT_TYPE_NAME_LEN {
        details.push(ErrorDetail::new(
            prefix.clone(),
            format!("name must be at most {} characters", MAX_CONTENT_TYPE_NAME_LEN),
        ));
    }
    if ct.name.starts_with(TABLE_PREFIX) {
        details.push(ErrorDetail::new(
            prefix.clone(),
            format!("name must not start with '{}'", TABLE_PREFIX),
        ));
    }
    if RESERVED_KEYWORDS.contains(&ct.name.as_str()) {
        details.push(ErrorDetail::new(prefix.clone(), "name is a SQL-reserved keyword".to_string()));
    }

    let mut seen_fields: HashSet<&str> = HashSet::new();
    for field in &ct.fields {
        let field_key = format!("{}.{}", ct.name, field.name);

        if !seen_fields.insert(field.name.as_str()) {
            details.push(ErrorDetail::new(field_key.clone(), "duplicate field name".to_string()));
        }
        validate_field(&ct.name, field, known_names, name_re, details);
    }
}

fn validate_field(
    type_name: &str,
    field: &Field,
    known_names: &HashSet<&str>,
    name_re: &Regex,
    details: &mut Vec<ErrorDetail>,
) {
    let key = format!("{}.{}", type_name, field.name);

    if !name_re.is_match(&field.name) {
        details.push(ErrorDetail::new(key.clone(), "name must match ^[a-z][a-z0-9_]*$".to_string()));
    }
    if field.name.len() > MAX_FIELD_NAME_LEN {
        details.push(ErrorDetail::new(
            key.clone(),
            format!("name must be at most {} characters", MAX_FIELD_NAME_LEN),
        ));
    }
    if SYSTEM_COLUMNS.contains(&field.name.as_str()) {
        details.push(ErrorDetail::new(key.clone(), "name collides with a reserved system column".to_string()));
    }
    if RESERVED_KEYWORDS.contains(&field.name.as_str()) {
        details.push(ErrorDetail::new(key.clone(), "name is a SQL-reserved keyword".to_string()));
    }

    let is_textual = field.is_textual();
    let is_numeric = field.is_numeric();
    let is_enum = field.field_type == FieldType::Enum;
    let is_relation = field.field_type == FieldType::Relation;

    if field.searchable && !is_textual {
        details.push(ErrorDetail::new(key.clone(), "searchable is only valid on textual types".to_string()));
    }
    if (field.min_length.is_some() || field.max_length.is_some() || field.regex.is_some()) && !is_textual
    {
        details.push(ErrorDetail::new(
            key.clone(),
            "min_length/max_length/regex are only valid on textual types".to_string(),
        ));
    }
    if (field.min.is_some() || field.max.is_some()) && !is_numeric {
        details.push(ErrorDetail::new(key.clone(), "min/max are only valid on numeric types".to_string()));
    }
    if field.values.is_some() && !is_enum {
        details.push(ErrorDetail::new(key.clone(), "values is only valid on enum fields".to_string()));
    }
    if (field.relates_to.is_some() || field.relation_type.is_some()) && !is_relation {
        details.push(ErrorDetail::new(
            key.clone(),
            "relates_to/relation_type are only valid on relation fields".to_string(),
        ));
    }
    if field.required && (field.field_type == FieldType::Media || field.is_relation_one()) {
        details.push(ErrorDetail::new(
            key.clone(),
            "required is rejected on media and relation-one fields".to_string(),
        ));
    }

    if is_enum {
        match &field.values {
            None => details.push(ErrorDetail::new(key.clone(), "enum fields require a non-empty values list".to_string())),
            Some(values) => {
                if values.is_empty() {
                    details.push(ErrorDetail::new(key.clone(), "values list must be non-empty".to_string()));
                }
                if values.iter().any(|v| v.is_empty()) {
                    details.push(ErrorDetail::new(key.clone(), "values must be non-empty strings".to_string()));
                }
                let unique: HashSet<&str> = values.iter().map(String::as_str).collect();
                if unique.len() != values.len() {
                    details.push(ErrorDetail::new(key.clone(), "values must be unique".to_string()));
                }
            }
        }
    }

    if is_relation {
        match &field.relates_to {
            None => details.push(ErrorDetail::new(key.clone(), "relation fields require relates_to".to_string())),
            Some(target) => {
                if !known_names.contains(target.as_str()) {
                    details.push(ErrorDetail::new(
                        key.clone(),
                        format!("relates_to references unknown content type '{}'", target),
                    ));
                }
            }
        }
        if !matches!(field.relation_type, Some(RelationType::One) | Some(RelationType::Many)) {
            details.push(ErrorDetail::new(
                key.clone(),
                "relation_type must be 'one' or 'many'".to_string(),
            ));
        }
    }

    if let Some(min_length) = field.min_length {
        if let Some(max_length) = field.max_length {
            if min_length > max_length {
                details.push(ErrorDetail::new(key.clone(), "min_length must be <= max_length".to_string()));
            }
        }
        let _ = min_length;
    }
    if let Some(max_length) = field.max_length {
        if max_length == 0 {
            details.push(ErrorDetail::new(key.clone(), "max_length must be > 0".to_string()));
        }
    }
    if let (Some(min), Some(max)) = (field.min, field.max) {
        if min > max {
            details.push(ErrorDetail::new(key.clone(), "min must be <= max".to_string()));
        }
    }

    if let Some(pattern) = &field.regex {
        if Regex::new(pattern).is_err() {
            details.push(ErrorDetail::new(key.clone(), "regex does not compile".to_string()));
        }
    }
}
