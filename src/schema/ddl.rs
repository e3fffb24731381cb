//! # DDL Generator
//!
//! Produces the SQL text for content-type tables: `CREATE TABLE`,
//! triggers, indexes, junction tables, and `ADD`/`DROP COLUMN`
//! (spec.md §4.3). Every identifier is quoted through
//! [`crate::schema::model::quote_ident`]; no value is ever interpolated —
//! callers bind values as parameters.

use crate::schema::model::{quote_ident, quote_literal, ContentType, Field, FieldType, RelationType};

/// Name of the shared `BEFORE UPDATE` trigger function every content
/// table uses to maintain `updated_at`.
pub const UPDATED_AT_FUNCTION: &str = "update_updated_at";

/// SQL base type for a field, per the spec.md §4.3 type mapping. Relation
/// and media fields are foreign keys, handled separately by
/// [`column_definition`].
pub fn base_sql_type(field: &Field) -> String {
    match field.field_type {
        FieldType::String => match field.max_length {
            Some(len) => format!("VARCHAR({})", len),
            None => "TEXT".to_string(),
        },
        FieldType::Text | FieldType::Richtext | FieldType::Enum => "TEXT".to_string(),
        FieldType::Int => "INTEGER".to_string(),
        FieldType::Float => "DOUBLE PRECISION".to_string(),
        FieldType::Boolean => "BOOLEAN".to_string(),
        FieldType::Date => "DATE".to_string(),
        FieldType::Time => "TIME".to_string(),
        FieldType::Json => "JSONB".to_string(),
        FieldType::Media => "UUID".to_string(),
        FieldType::Relation => "UUID".to_string(),
    }
}

/// The full column definition fragment (type + default + references),
/// used by `CREATE TABLE`. Does not include the trailing `NOT NULL`;
/// nullability is added by the caller since `ADD COLUMN` on a populated
/// table must stay nullable regardless of the schema's `required` flag
/// (spec.md §4.3 ADD COLUMN note).
pub fn column_definition(field: &Field) -> String {
    let mut def = base_sql_type(field);

    match field.field_type {
        FieldType::Boolean => def.push_str(" DEFAULT false"),
        FieldType::Media => def.push_str(" REFERENCES media(id) ON DELETE SET NULL"),
        FieldType::Relation if field.relation_type == Some(RelationType::One) => {
            if let Some(target) = &field.relates_to {
                def.push_str(&format!(
                    " REFERENCES {}(id) ON DELETE SET NULL",
                    quote_ident(&format!("ct_{}", target))
                ));
            }
        }
        _ => {}
    }

    def
}

fn constraint_name(table: &str, field: &str) -> String {
    format!("chk_{}_{}", table, field)
}

fn enum_check_clause(field: &Field) -> String {
    let values = field
        .values
        .as_deref()
        .unwrap_or_default()
        .iter()
        .map(|v| quote_literal(v))
        .collect::<Vec<_>>()
        .join(", ");
    format!("{} IN ({})", quote_ident(&field.name), values)
}

/// Emit the complete set of statements needed to materialize a brand new
/// content type: the table itself, enum CHECK constraints, standard
/// indexes, the shared trigger function (idempotent `CREATE OR REPLACE`),
/// the per-table `BEFORE UPDATE` trigger, the search-vector trigger when
/// applicable, and any `relation_type: many` junction tables.
pub fn create_table_statements(ct: &ContentType) -> Vec<String> {
    let table = ct.table_name();
    let quoted_table = quote_ident(&table);
    let mut statements = Vec::new();

    let mut columns = vec![
        format!("{} UUID PRIMARY KEY DEFAULT gen_random_uuid()", quote_ident("id")),
        format!("{} TEXT NOT NULL DEFAULT 'draft' CHECK ({} IN ('draft', 'published'))", quote_ident("status"), quote_ident("status")),
    ];

    for field in ct.column_fields() {
        let mut col = format!("{} {}", quote_ident(&field.name), column_definition(field));
        if field.required {
            col.push_str(" NOT NULL");
        }
        columns.push(col);
    }

    columns.push(format!("{} tsvector", quote_ident("search_vector")));
    columns.push(format!("{} UUID REFERENCES admins(id) ON DELETE SET NULL", quote_ident("created_by")));
    columns.push(format!("{} UUID REFERENCES admins(id) ON DELETE SET NULL", quote_ident("updated_by")));
    columns.push(format!("{} TIMESTAMPTZ NOT NULL DEFAULT now()", quote_ident("created_at")));
    columns.push(format!("{} TIMESTAMPTZ NOT NULL DEFAULT now()", quote_ident("updated_at")));
    columns.push(format!("{} TIMESTAMPTZ", quote_ident("published_at")));

    for field in ct.fields.iter().filter(|f| f.field_type == FieldType::Enum) {
        columns.push(format!(
            "CONSTRAINT {} CHECK({})",
            quote_ident(&constraint_name(&table, &field.name)),
            enum_check_clause(field)
        ));
    }

    statements.push(format!("CREATE TABLE {} (\n  {}\n)", quoted_table, columns.join(",\n  ")));

    statements.push(format!(
        "CREATE INDEX {} ON {} ({})",
        quote_ident(&format!("idx_{}_status", table)),
        quoted_table,
        quote_ident("status")
    ));
    statements.push(format!(
        "CREATE INDEX {} ON {} ({})",
        quote_ident(&format!("idx_{}_created_at", table)),
        quoted_table,
        quote_ident("created_at")
    ));

    for field in ct.column_fields() {
        if field.field_type == FieldType::Media || field.is_relation_one() {
            statements.push(fk_index_statement(&table, &field.name));
        }
        if field.unique {
            statements.push(unique_index_statement(&table, &field.name));
        }
    }

    if ct.has_searchable_fields() {
        statements.push(search_index_statement(&table));
    }

    statements.push(updated_at_trigger_function_statement());
    statements.push(updated_at_trigger_statement(&table));

    if ct.has_searchable_fields() {
        statements.push(search_trigger_function_statement(ct));
        statements.push(search_trigger_statement(&table));
    }

    for field in ct.fields.iter().filter(|f| f.is_relation_many()) {
        statements.push(junction_table_statement(ct, field));
    }

    statements
}

pub fn fk_index_statement(table: &str, column: &str) -> String {
    format!(
        "CREATE INDEX {} ON {} ({})",
        quote_ident(&format!("idx_{}_{}", table, column)),
        quote_ident(table),
        quote_ident(column)
    )
}

pub fn unique_index_statement(table: &str, column: &str) -> String {
    format!(
        "CREATE UNIQUE INDEX {} ON {} ({})",
        quote_ident(&format!("uq_{}_{}", table, column)),
        quote_ident(table),
        quote_ident(column)
    )
}

pub fn drop_index_statement(index_name: &str) -> String {
    format!("DROP INDEX IF EXISTS {}", quote_ident(index_name))
}

pub fn search_index_statement(table: &str) -> String {
    format!(
        "CREATE INDEX {} ON {} USING GIN ({})",
        quote_ident(&format!("idx_{}_search", table)),
        quote_ident(table),
        quote_ident("search_vector")
    )
}

pub fn updated_at_trigger_function_statement() -> String {
    format!(
        "CREATE OR REPLACE FUNCTION {}() RETURNS trigger AS $$\nBEGIN\n  NEW.{} = now();\n  RETURN NEW;\nEND;\n$$ LANGUAGE plpgsql",
        quote_ident(UPDATED_AT_FUNCTION),
        quote_ident("updated_at")
    )
}

pub fn updated_at_trigger_statement(table: &str) -> String {
    format!(
        "CREATE TRIGGER {} BEFORE UPDATE ON {} FOR EACH ROW EXECUTE FUNCTION {}()",
        quote_ident(&format!("{}_set_updated_at", table)),
        quote_ident(table),
        quote_ident(UPDATED_AT_FUNCTION)
    )
}

fn search_trigger_function_name(table: &str) -> String {
    format!("{}_search_update", table)
}

/// Builds the per-table search-vector trigger function that concatenates
/// every `searchable` field into `to_tsvector('english', ...)`.
pub fn search_trigger_function_statement(ct: &ContentType) -> String {
    let table = ct.table_name();
    let concatenation = ct
        .searchable_fields()
        .map(|f| format!("coalesce(NEW.{}, '')", quote_ident(&f.name)))
        .collect::<Vec<_>>()
        .join(" || ' ' || ");

    format!(
        "CREATE OR REPLACE FUNCTION {}() RETURNS trigger AS $$\nBEGIN\n  NEW.{} = to_tsvector('english', {});\n  RETURN NEW;\nEND;\n$$ LANGUAGE plpgsql",
        quote_ident(&search_trigger_function_name(&table)),
        quote_ident("search_vector"),
        concatenation
    )
}

pub fn search_trigger_statement(table: &str) -> String {
    format!(
        "CREATE TRIGGER {} BEFORE INSERT OR UPDATE ON {} FOR EACH ROW EXECUTE FUNCTION {}()",
        quote_ident(&format!("{}_search_trigger", table)),
        quote_ident(table),
        quote_ident(&search_trigger_function_name(table))
    )
}

pub fn drop_search_trigger_statements(table: &str) -> Vec<String> {
    vec![
        format!("DROP TRIGGER IF EXISTS {} ON {}", quote_ident(&format!("{}_search_trigger", table)), quote_ident(table)),
        format!("DROP FUNCTION IF EXISTS {}()", quote_ident(&search_trigger_function_name(table))),
    ]
}

pub fn junction_table_statement(ct: &ContentType, field: &Field) -> String {
    let junction = field.junction_table_name(&ct.name);
    let target_table = format!("ct_{}", field.relates_to.as_deref().unwrap_or_default());

    format!(
        "CREATE TABLE {} (\n  {} UUID NOT NULL REFERENCES {}(id) ON DELETE CASCADE,\n  {} UUID NOT NULL REFERENCES {}(id) ON DELETE CASCADE,\n  PRIMARY KEY ({}, {})\n)",
        quote_ident(&junction),
        quote_ident("source_id"),
        quote_ident(&ct.table_name()),
        quote_ident("target_id"),
        quote_ident(&target_table),
        quote_ident("source_id"),
        quote_ident("target_id"),
    )
}

pub fn drop_junction_table_statement(junction_table: &str) -> String {
    format!("DROP TABLE IF EXISTS {}", quote_ident(junction_table))
}

/// `ADD COLUMN`. Includes `NOT NULL` when the field is required but never
/// inline `UNIQUE` — a separate `CREATE UNIQUE INDEX` is emitted by the
/// Diff Engine to avoid duplicating that logic (spec.md §4.3).
pub fn add_column_statement(table: &str, field: &Field) -> String {
    let mut stmt = format!(
        "ALTER TABLE {} ADD COLUMN {} {}",
        quote_ident(table),
        quote_ident(&field.name),
        column_definition(field)
    );
    if field.required {
        stmt.push_str(" NOT NULL");
    }
    stmt
}

pub fn set_not_null_statement(table: &str, column: &str) -> String {
    format!("ALTER TABLE {} ALTER COLUMN {} SET NOT NULL", quote_ident(table), quote_ident(column))
}

pub fn drop_not_null_statement(table: &str, column: &str) -> String {
    format!("ALTER TABLE {} ALTER COLUMN {} DROP NOT NULL", quote_ident(table), quote_ident(column))
}

pub fn drop_column_statement(table: &str, column: &str) -> String {
    format!("ALTER TABLE {} DROP COLUMN {}", quote_ident(table), quote_ident(column))
}

pub fn alter_column_type_statement(table: &str, column: &str, new_type: &str) -> String {
    format!(
        "ALTER TABLE {} ALTER COLUMN {} TYPE {} USING {}::{}",
        quote_ident(table),
        quote_ident(column),
        new_type,
        quote_ident(column),
        new_type
    )
}

pub fn add_enum_constraint_statement(table: &str, field: &Field) -> String {
    format!(
        "ALTER TABLE {} ADD CONSTRAINT {} CHECK({})",
        quote_ident(table),
        quote_ident(&constraint_name(table, &field.name)),
        enum_check_clause(field)
    )
}

pub fn drop_constraint_statement(table: &str, constraint: &str) -> String {
    format!("ALTER TABLE {} DROP CONSTRAINT IF EXISTS {}", quote_ident(table), quote_ident(constraint))
}

pub fn enum_constraint_name(table: &str, field: &str) -> String {
    constraint_name(table, field)
}
