//! # Diff Engine
//!
//! Computes the list of changes between a loaded [`ContentType`] and its
//! previously-applied state, classifying each as safe or breaking
//! (spec.md §4.4).

use std::collections::HashSet;

use crate::schema::ddl;
use crate::schema::model::ContentType;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeType {
    CreateTable,
    AddColumn,
    DropColumn,
    AlterColumn,
    AddIndex,
    DropIndex,
    AddConstraint,
    DropConstraint,
}

/// A single DDL change, already rendered to SQL text, with its safety
/// classification (spec.md §4.4).
#[derive(Debug, Clone)]
pub struct Change {
    pub change_type: ChangeType,
    pub table: String,
    pub column: Option<String>,
    /// Each entry is one complete, independently-executable statement.
    /// Never joined into a single string: a couple of these (the
    /// trigger-function bodies) are themselves `$...$`-quoted PL/pgSQL
    /// containing internal `;` characters, so splitting on statement
    /// boundaries after the fact isn't safe.
    pub sql: Vec<String>,
    pub safe: bool,
    pub detail: String,
}

impl Change {
    fn new(
        change_type: ChangeType,
        table: impl Into<String>,
        column: Option<String>,
        sql: impl Into<Vec<String>>,
        safe: bool,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            change_type,
            table: table.into(),
            column,
            sql: sql.into(),
            safe,
            detail: detail.into(),
        }
    }
}

/// Diff a newly loaded content type against its previously applied
/// version, if any. `existing == None` means the type has never been
/// applied and the whole table must be created.
pub fn diff_schema(new: &ContentType, existing: Option<&ContentType>) -> Vec<Change> {
    let Some(existing) = existing else {
        return diff_new_table(new);
    };

    let table = new.table_name();
    let mut changes = Vec::new();

    let new_names: HashSet<&str> = new.fields.iter().map(|f| f.name.as_str()).collect();
    let old_names: HashSet<&str> = existing.fields.iter().map(|f| f.name.as_str()).collect();

    for field in &new.fields {
        if old_names.contains(field.name.as_str()) {
            continue;
        }
        if field.is_relation_many() {
            changes.push(Change::new(
                ChangeType::CreateTable,
                field.junction_table_name(&new.name),
                None,
                vec![ddl::junction_table_statement(new, field)],
                true,
                format!("create junction table for new relation '{}'", field.name),
            ));
            continue;
        }
        let safe = !field.required;
        changes.push(Change::new(
            ChangeType::AddColumn,
            table.clone(),
            Some(field.name.clone()),
            vec![ddl::add_column_statement(&table, field)],
            safe,
            if safe {
                format!("add nullable column '{}'", field.name)
            } else {
                format!("add NOT NULL column '{}'", field.name)
            },
        ));
        if field.unique {
            changes.push(Change::new(
                ChangeType::AddIndex,
                table.clone(),
                Some(field.name.clone()),
                vec![ddl::unique_index_statement(&table, &field.name)],
                true,
                format!("add unique index on new column '{}'", field.name),
            ));
        }
        if field.field_type == crate::schema::model::FieldType::Media || field.is_relation_one() {
            changes.push(Change::new(
                ChangeType::AddIndex,
                table.clone(),
                Some(field.name.clone()),
                vec![ddl::fk_index_statement(&table, &field.name)],
                true,
                format!("add FK index on new column '{}'", field.name),
            ));
        }
    }

    for field in &existing.fields {
        if new_names.contains(field.name.as_str()) {
            continue;
        }
        if field.is_relation_many() {
            let junction = field.junction_table_name(&existing.name);
            changes.push(Change::new(
                ChangeType::DropColumn,
                junction.clone(),
                None,
                vec![ddl::drop_junction_table_statement(&junction)],
                false,
                format!("drop junction table for removed relation '{}'", field.name),
            ));
        } else {
            changes.push(Change::new(
                ChangeType::DropColumn,
                table.clone(),
                Some(field.name.clone()),
                vec![ddl::drop_column_statement(&table, &field.name)],
                false,
                format!("drop column '{}'", field.name),
            ));
        }
    }

    for new_field in &new.fields {
        let Some(old_field) = existing.fields.iter().find(|f| f.name == new_field.name) else {
            continue;
        };
        if new_field.is_relation_many() || old_field.is_relation_many() {
            continue;
        }

        let old_type = ddl::base_sql_type(old_field);
        let new_type = ddl::base_sql_type(new_field);
        if old_type != new_type {
            changes.push(Change::new(
                ChangeType::AlterColumn,
                table.clone(),
                Some(new_field.name.clone()),
                vec![ddl::alter_column_type_statement(&table, &new_field.name, &new_type)],
                false,
                format!("change base type of '{}' from {} to {}", new_field.name, old_type, new_type),
            ));
        }

        if !old_field.required && new_field.required {
            changes.push(Change::new(
                ChangeType::AlterColumn,
                table.clone(),
                Some(new_field.name.clone()),
                vec![ddl::set_not_null_statement(&table, &new_field.name)],
                false,
                format!("set NOT NULL on '{}'", new_field.name),
            ));
        } else if old_field.required && !new_field.required {
            changes.push(Change::new(
                ChangeType::AlterColumn,
                table.clone(),
                Some(new_field.name.clone()),
                vec![ddl::drop_not_null_statement(&table, &new_field.name)],
                true,
                format!("drop NOT NULL on '{}'", new_field.name),
            ));
        }

        if new_field.unique && !old_field.unique {
            changes.push(Change::new(
                ChangeType::AddIndex,
                table.clone(),
                Some(new_field.name.clone()),
                vec![ddl::unique_index_statement(&table, &new_field.name)],
                true,
                format!("add unique index on '{}'", new_field.name),
            ));
        } else if !new_field.unique && old_field.unique {
            changes.push(Change::new(
                ChangeType::DropIndex,
                table.clone(),
                Some(new_field.name.clone()),
                vec![ddl::drop_index_statement(&format!("uq_{}_{}", table, new_field.name))],
                true,
                format!("drop unique index on '{}'", new_field.name),
            ));
        }

        if new_field.searchable && !old_field.searchable {
            changes.push(Change::new(
                ChangeType::AddIndex,
                table.clone(),
                Some(new_field.name.clone()),
                vec![ddl::search_index_statement(&table)],
                true,
                format!("enable search on '{}', rebuilding search trigger", new_field.name),
            ));
        } else if !new_field.searchable && old_field.searchable && !new.has_searchable_fields() {
            let mut drops = ddl::drop_search_trigger_statements(&table);
            drops.push(ddl::drop_index_statement(&format!("idx_{}_search", table)));
            changes.push(Change::new(
                ChangeType::DropIndex,
                table.clone(),
                Some(new_field.name.clone()),
                drops,
                true,
                "disable search, tearing down search trigger".to_string(),
            ));
        }

        if new_field.field_type == crate::schema::model::FieldType::Enum {
            let old_values: HashSet<&str> =
                old_field.values.as_deref().unwrap_or_default().iter().map(String::as_str).collect();
            let new_values: HashSet<&str> =
                new_field.values.as_deref().unwrap_or_default().iter().map(String::as_str).collect();

            if old_values != new_values {
                let constraint = ddl::enum_constraint_name(&table, &new_field.name);
                changes.push(Change::new(
                    ChangeType::DropConstraint,
                    table.clone(),
                    Some(new_field.name.clone()),
                    vec![ddl::drop_constraint_statement(&table, &constraint)],
                    true,
                    format!("drop enum constraint on '{}' for rebuild", new_field.name),
                ));

                let narrowed = !old_values.iter().all(|v| new_values.contains(v));
                changes.push(Change::new(
                    ChangeType::AddConstraint,
                    table.clone(),
                    Some(new_field.name.clone()),
                    vec![ddl::add_enum_constraint_statement(&table, new_field)],
                    !narrowed,
                    if narrowed {
                        format!("enum '{}' removed at least one existing value", new_field.name)
                    } else {
                        format!("enum '{}' widened with new values only", new_field.name)
                    },
                ));
            }
        }
    }

    // Rebuild the search trigger function itself when the set of
    // searchable fields changed shape but search stays enabled overall,
    // so the concatenation expression picks up the new field list.
    if new.has_searchable_fields()
        && existing.has_searchable_fields()
        && new.searchable_fields().map(|f| f.name.as_str()).collect::<Vec<_>>()
            != existing.searchable_fields().map(|f| f.name.as_str()).collect::<Vec<_>>()
    {
        changes.push(Change::new(
            ChangeType::AlterColumn,
            table.clone(),
            None,
            vec![ddl::search_trigger_function_statement(new)],
            true,
            "rebuild search trigger function for changed searchable field list".to_string(),
        ));
    } else if new.has_searchable_fields() && !existing.has_searchable_fields() {
        changes.push(Change::new(
            ChangeType::AlterColumn,
            table.clone(),
            None,
            vec![ddl::search_trigger_function_statement(new), ddl::search_trigger_statement(&table)],
            true,
            "create search trigger function and trigger".to_string(),
        ));
    }

    changes
}

fn diff_new_table(ct: &ContentType) -> Vec<Change> {
    let table = ct.table_name();
    vec![Change::new(
        ChangeType::CreateTable,
        table.clone(),
        None,
        ddl::create_table_statements(ct),
        true,
        format!("create table '{}'", table),
    )]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::model::{Field, FieldType, RelationType};

    fn field(name: &str, field_type: FieldType) -> Field {
        Field {
            name: name.to_string(),
            field_type,
            required: false,
            unique: false,
            searchable: false,
            min_length: None,
            max_length: None,
            min: None,
            max: None,
            regex: None,
            values: None,
            relates_to: None,
            relation_type: None,
        }
    }

    fn content_type(name: &str, fields: Vec<Field>) -> ContentType {
        ContentType {
            name: name.to_string(),
            display_name: name.to_string(),
            public_read: true,
            fields,
            schema_hash: "hash".to_string(),
        }
    }

    #[test]
    fn new_table_is_a_single_safe_create() {
        let ct = content_type("posts", vec![field("title", FieldType::String)]);
        let changes = diff_schema(&ct, None);
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].change_type, ChangeType::CreateTable);
        assert!(changes[0].safe);
    }

    #[test]
    fn identical_schema_has_no_changes() {
        let ct = content_type("posts", vec![field("title", FieldType::String)]);
        let changes = diff_schema(&ct, Some(&ct));
        assert!(changes.is_empty());
    }

    #[test]
    fn required_new_column_is_breaking() {
        let old = content_type("posts", vec![]);
        let mut required_field = field("title", FieldType::String);
        required_field.required = true;
        let new = content_type("posts", vec![required_field]);

        let changes = diff_schema(&new, Some(&old));
        assert_eq!(changes.len(), 1);
        assert!(!changes[0].safe);
        assert_eq!(changes[0].change_type, ChangeType::AddColumn);
    }

    #[test]
    fn base_type_change_is_breaking() {
        let old = content_type("posts", vec![field("title", FieldType::Text)]);
        let new = content_type("posts", vec![field("title", FieldType::Int)]);

        let changes = diff_schema(&new, Some(&old));
        let alter = changes.iter().find(|c| c.change_type == ChangeType::AlterColumn).unwrap();
        assert!(!alter.safe);
        assert_eq!(alter.table, "ct_posts");
        assert_eq!(alter.column.as_deref(), Some("title"));
    }

    #[test]
    fn enum_widen_is_safe() {
        let mut old_enum = field("category", FieldType::Enum);
        old_enum.values = Some(vec!["tech".to_string(), "design".to_string()]);
        let mut new_enum = field("category", FieldType::Enum);
        new_enum.values = Some(vec!["tech".to_string(), "design".to_string(), "business".to_string()]);

        let old = content_type("posts", vec![old_enum]);
        let new = content_type("posts", vec![new_enum]);

        let changes = diff_schema(&new, Some(&old));
        let drop = changes.iter().find(|c| c.change_type == ChangeType::DropConstraint).unwrap();
        let add = changes.iter().find(|c| c.change_type == ChangeType::AddConstraint).unwrap();
        assert!(drop.safe);
        assert!(add.safe);
    }

    #[test]
    fn enum_narrow_is_breaking() {
        let mut old_enum = field("category", FieldType::Enum);
        old_enum.values = Some(vec!["tech".to_string(), "design".to_string(), "business".to_string()]);
        let mut new_enum = field("category", FieldType::Enum);
        new_enum.values = Some(vec!["tech".to_string(), "design".to_string()]);

        let old = content_type("posts", vec![old_enum]);
        let new = content_type("posts", vec![new_enum]);

        let changes = diff_schema(&new, Some(&old));
        let add = changes.iter().find(|c| c.change_type == ChangeType::AddConstraint).unwrap();
        assert!(!add.safe);
    }

    #[test]
    fn dropped_column_is_breaking() {
        let old = content_type("posts", vec![field("subtitle", FieldType::String)]);
        let new = content_type("posts", vec![]);

        let changes = diff_schema(&new, Some(&old));
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].change_type, ChangeType::DropColumn);
        assert!(!changes[0].safe);
    }

    #[test]
    fn drop_not_null_is_safe() {
        let mut old_field = field("title", FieldType::String);
        old_field.required = true;
        let new_field = field("title", FieldType::String);

        let old = content_type("posts", vec![old_field]);
        let new = content_type("posts", vec![new_field]);

        let changes = diff_schema(&new, Some(&old));
        assert!(changes.iter().any(|c| c.safe && c.change_type == ChangeType::AlterColumn));
    }

    #[test]
    fn removed_many_relation_drops_junction_table() {
        let mut rel = field("tags", FieldType::Relation);
        rel.relation_type = Some(RelationType::Many);
        rel.relates_to = Some("tags".to_string());

        let old = content_type("posts", vec![rel]);
        let new = content_type("posts", vec![]);

        let changes = diff_schema(&new, Some(&old));
        assert_eq!(changes.len(), 1);
        assert!(!changes[0].safe);
        assert!(changes[0].sql.iter().any(|s| s.contains("ct_posts_tags_rel")));
    }
}
