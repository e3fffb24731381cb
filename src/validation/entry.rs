//! # Validation Engine
//!
//! Validates an entry payload against a loaded [`ContentType`], field by
//! field (spec.md §4.6). Total, not first-fail: every violation across
//! every field is reported.

use std::collections::HashSet;

use regex::Regex;
use serde_json::Value;

use crate::schema::model::{Field, FieldType, RelationType};
use crate::schema::ContentType;

/// A single field-level validation problem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self { field: field.into(), message: message.into() }
    }
}

const UUID_LEN: usize = 36;

fn looks_like_uuid(value: &str) -> bool {
    if value.len() != UUID_LEN {
        return false;
    }
    let bytes = value.as_bytes();
    let dash_positions = [8, 13, 18, 23];
    for (i, &b) in bytes.iter().enumerate() {
        if dash_positions.contains(&i) {
            if b != b'-' {
                return false;
            }
        } else if !b.is_ascii_hexdigit() {
            return false;
        }
    }
    true
}

fn is_valid_date(value: &str) -> bool {
    let parts: Vec<&str> = value.split('-').collect();
    if parts.len() != 3 {
        return false;
    }
    parts[0].len() == 4
        && parts[1].len() == 2
        && parts[2].len() == 2
        && parts.iter().all(|p| p.chars().all(|c| c.is_ascii_digit()))
}

fn is_valid_time(value: &str) -> bool {
    let parts: Vec<&str> = value.split(':').collect();
    (parts.len() == 2 || parts.len() == 3)
        && parts.iter().all(|p| p.len() == 2 && p.chars().all(|c| c.is_ascii_digit()))
}

/// Validate an ingress payload against a content type's declared fields.
///
/// On create, every `required` field must be present. On update, absent
/// fields are simply skipped (partial updates are allowed). Unknown keys
/// in `data` are always rejected — this is what keeps caller-supplied
/// JSON from ever reaching the repository as a column name.
pub fn validate_entry(schema: &ContentType, data: &Value, is_update: bool) -> Vec<FieldError> {
    let mut errors = Vec::new();

    let Some(object) = data.as_object() else {
        errors.push(FieldError::new("_body", "payload must be a JSON object"));
        return errors;
    };

    let known_fields: HashSet<&str> = schema.fields.iter().map(|f| f.name.as_str()).collect();
    for key in object.keys() {
        if !known_fields.contains(key.as_str()) {
            errors.push(FieldError::new(key.clone(), "unknown field"));
        }
    }

    for field in &schema.fields {
        if field.is_relation_many() {
            continue;
        }

        let value = object.get(&field.name);

        match value {
            None => {
                if !is_update && field.required {
                    errors.push(FieldError::new(field.name.clone(), "field is required"));
                }
            }
            Some(Value::Null) => {
                if field.required {
                    errors.push(FieldError::new(field.name.clone(), "field is required"));
                }
            }
            Some(v) => validate_field_value(field, v, &mut errors),
        }
    }

    errors
}

fn validate_field_value(field: &Field, value: &Value, errors: &mut Vec<FieldError>) {
    match field.field_type {
        FieldType::String | FieldType::Text | FieldType::Richtext => {
            let Some(s) = value.as_str() else {
                errors.push(FieldError::new(field.name.clone(), "must be a string"));
                return;
            };
            validate_text_constraints(field, s, errors);
        }
        FieldType::Int => {
            match value.as_i64().or_else(|| value.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)) {
                Some(n) => validate_numeric_constraints(field, n as f64, errors),
                None => errors.push(FieldError::new(field.name.clone(), "must be a whole number")),
            }
        }
        FieldType::Float => match value.as_f64() {
            Some(n) => validate_numeric_constraints(field, n, errors),
            None => errors.push(FieldError::new(field.name.clone(), "must be a number")),
        },
        FieldType::Boolean => {
            if value.as_bool().is_none() {
                errors.push(FieldError::new(field.name.clone(), "must be a boolean"));
            }
        }
        FieldType::Date => match value.as_str() {
            Some(s) if is_valid_date(s) => {}
            _ => errors.push(FieldError::new(field.name.clone(), "must be YYYY-MM-DD")),
        },
        FieldType::Time => match value.as_str() {
            Some(s) if is_valid_time(s) => {}
            _ => errors.push(FieldError::new(field.name.clone(), "must be HH:MM or HH:MM:SS")),
        },
        FieldType::Enum => {
            let Some(s) = value.as_str() else {
                errors.push(FieldError::new(field.name.clone(), "must be a string"));
                return;
            };
            let allowed = field.values.as_deref().unwrap_or_default();
            if !allowed.iter().any(|v| v == s) {
                errors.push(FieldError::new(field.name.clone(), "value is not in the declared enum list"));
            }
        }
        FieldType::Json => {}
        FieldType::Media => match value.as_str() {
            Some(s) if looks_like_uuid(s) => {}
            _ => errors.push(FieldError::new(field.name.clone(), "must be a UUID")),
        },
        FieldType::Relation => {
            if field.relation_type == Some(RelationType::One) {
                match value.as_str() {
                    Some(s) if looks_like_uuid(s) => {}
                    _ => errors.push(FieldError::new(field.name.clone(), "must be a UUID")),
                }
            }
        }
    }
}

fn validate_text_constraints(field: &Field, value: &str, errors: &mut Vec<FieldError>) {
    let len = value.chars().count() as u32;
    if let Some(min_length) = field.min_length {
        if len < min_length {
            errors.push(FieldError::new(field.name.clone(), format!("must be at least {} characters", min_length)));
        }
    }
    if let Some(max_length) = field.max_length {
        if len > max_length {
            errors.push(FieldError::new(field.name.clone(), format!("must be at most {} characters", max_length)));
        }
    }
    if let Some(pattern) = &field.regex {
        match Regex::new(pattern) {
            Ok(re) => {
                if !re.is_match(value) {
                    errors.push(FieldError::new(field.name.clone(), "does not match the required pattern"));
                }
            }
            Err(_) => {
                errors.push(FieldError::new(field.name.clone(), "field has an invalid regex constraint"));
            }
        }
    }
}

fn validate_numeric_constraints(field: &Field, value: f64, errors: &mut Vec<FieldError>) {
    if let Some(min) = field.min {
        if value < min {
            errors.push(FieldError::new(field.name.clone(), format!("must be >= {}", min)));
        }
    }
    if let Some(max) = field.max {
        if value > max {
            errors.push(FieldError::new(field.name.clone(), format!("must be <= {}", max)));
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::schema::model::ContentType;

    fn text_field(name: &str) -> Field {
        Field {
            name: name.to_string(),
            field_type: FieldType::String,
            required: true,
            unique: false,
            searchable: false,
            min_length: Some(1),
            max_length: Some(20),
            min: None,
            max: None,
            regex: None,
            values: None,
            relates_to: None,
            relation_type: None,
        }
    }

    fn schema(fields: Vec<Field>) -> ContentType {
        ContentType {
            name: "posts".to_string(),
            display_name: "Posts".to_string(),
            public_read: true,
            fields,
            schema_hash: String::new(),
        }
    }

    #[test]
    fn rejects_unknown_fields() {
        let schema = schema(vec![text_field("title")]);
        let errors = validate_entry(&schema, &json!({"title": "hi", "evil": "x"}), false);
        assert!(errors.iter().any(|e| e.field == "evil"));
    }

    #[test]
    fn required_field_missing_on_create_is_an_error() {
        let schema = schema(vec![text_field("title")]);
        let errors = validate_entry(&schema, &json!({}), false);
        assert!(errors.iter().any(|e| e.field == "title"));
    }

    #[test]
    fn required_field_absent_on_update_is_skipped() {
        let schema = schema(vec![text_field("title")]);
        let errors = validate_entry(&schema, &json!({}), true);
        assert!(errors.is_empty());
    }

    #[test]
    fn reports_every_violation_not_first_fail() {
        let schema = schema(vec![text_field("title"), text_field("slug")]);
        let errors = validate_entry(&schema, &json!({}), false);
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn counts_code_points_not_bytes() {
        let mut field = text_field("title");
        field.min_length = Some(3);
        field.max_length = Some(3);
        let schema = schema(vec![field]);
        // 3 codepoints, each multi-byte
        let errors = validate_entry(&schema, &json!({"title": "日本語"}), false);
        assert!(errors.is_empty());
    }

    #[test]
    fn min_length_zero_is_valid() {
        let mut field = text_field("title");
        field.min_length = Some(0);
        field.max_length = Some(20);
        field.required = false;
        let schema = schema(vec![field]);
        let errors = validate_entry(&schema, &json!({"title": ""}), false);
        assert!(errors.is_empty());
    }

    #[test]
    fn rejects_bad_enum_value() {
        let mut field = text_field("status");
        field.field_type = FieldType::Enum;
        field.values = Some(vec!["draft".to_string(), "live".to_string()]);
        field.min_length = None;
        field.max_length = None;
        let schema = schema(vec![field]);
        let errors = validate_entry(&schema, &json!({"status": "archived"}), false);
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn rejects_malformed_media_uuid() {
        let mut field = text_field("cover");
        field.field_type = FieldType::Media;
        field.min_length = None;
        field.max_length = None;
        field.required = false;
        let schema = schema(vec![field]);
        let errors = validate_entry(&schema, &json!({"cover": "not-a-uuid"}), false);
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn accepts_valid_media_uuid() {
        let mut field = text_field("cover");
        field.field_type = FieldType::Media;
        field.min_length = None;
        field.max_length = None;
        field.required = false;
        let schema = schema(vec![field]);
        let errors = validate_entry(&schema, &json!({"cover": "3fa85f64-5717-4562-b3fc-2c963f66afa6"}), false);
        assert!(errors.is_empty());
    }

    #[test]
    fn skips_relation_many_fields_entirely() {
        let mut field = text_field("tags");
        field.field_type = FieldType::Relation;
        field.relation_type = Some(RelationType::Many);
        field.required = false;
        field.min_length = None;
        field.max_length = None;
        let schema = schema(vec![field]);
        let errors = validate_entry(&schema, &json!({"tags": "whatever, not even checked"}), false);
        assert!(errors.is_empty());
    }

    #[test]
    fn rejects_non_object_payload() {
        let schema = schema(vec![text_field("title")]);
        let errors = validate_entry(&schema, &json!("not an object"), false);
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn date_requires_iso_format() {
        let mut field = text_field("published_on");
        field.field_type = FieldType::Date;
        field.min_length = None;
        field.max_length = None;
        field.required = false;
        let schema = schema(vec![field]);
        assert!(validate_entry(&schema, &json!({"published_on": "2026-07-28"}), false).is_empty());
        assert_eq!(validate_entry(&schema, &json!({"published_on": "07/28/2026"}), false).len(), 1);
    }
}
