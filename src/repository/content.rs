//! # Content Repository
//!
//! Generates parameterized SQL against the schema-derived `ct_<name>`
//! tables: list, get-by-id, insert, update, publish (spec.md §4.7). Every
//! identifier is quoted through [`quote_ident`]; every caller-supplied
//! value is bound positionally, never interpolated.

use chrono::{NaiveDate, NaiveTime, Utc};
use serde_json::Value;
use sqlx::postgres::{PgArguments, PgRow};
use sqlx::{Arguments, PgPool, Row};
use tracing::instrument;
use uuid::Uuid;

use crate::errors::{MithrilError, Result};
use crate::repository::search::{self, SortDirection};
use crate::schema::model::{quote_ident, Field, FieldType, RelationType};
use crate::schema::ContentType;

/// Caller-supplied shape of a `List` call, already validated by the
/// upstream query-string parser (spec.md §4.7: the sort field has been
/// whitelisted before it reaches here).
#[derive(Debug, Clone)]
pub struct ListQuery {
    pub filters: Vec<(String, Value)>,
    pub search: Option<String>,
    pub sort_field: String,
    pub sort_direction: SortDirection,
    pub page: u32,
    pub per_page: u32,
    pub published_only: bool,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            filters: Vec::new(),
            search: None,
            sort_field: "created_at".to_string(),
            sort_direction: SortDirection::Desc,
            page: 1,
            per_page: 20,
            published_only: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ListResult {
    pub total: i64,
    pub entries: Vec<Value>,
}

struct WhereClause {
    sql: String,
    args: PgArguments,
    search_param_index: Option<usize>,
    next_param: usize,
}

fn bind_error(err: sqlx::error::BoxDynError) -> MithrilError {
    MithrilError::internal(format!("failed to bind query parameter: {}", err))
}

fn parse_time(value: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(value, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M"))
        .map_err(|_| MithrilError::InvalidParams(format!("'{}' is not a valid time", value)))
}

fn bind_field_value(args: &mut PgArguments, field: &Field, value: &Value) -> Result<()> {
    let invalid = || MithrilError::InvalidParams(format!("'{}' has an invalid value", field.name));

    match field.field_type {
        FieldType::String | FieldType::Text | FieldType::Richtext | FieldType::Enum => {
            args.add(value.as_str().ok_or_else(invalid)?.to_string()).map_err(bind_error)
        }
        FieldType::Int => {
            let n = value
                .as_i64()
                .or_else(|| value.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64))
                .ok_or_else(invalid)?;
            args.add(n as i32).map_err(bind_error)
        }
        FieldType::Float => args.add(value.as_f64().ok_or_else(invalid)?).map_err(bind_error),
        FieldType::Boolean => args.add(value.as_bool().ok_or_else(invalid)?).map_err(bind_error),
        FieldType::Date => {
            let s = value.as_str().ok_or_else(invalid)?;
            let date = NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|_| invalid())?;
            args.add(date).map_err(bind_error)
        }
        FieldType::Time => {
            let time = parse_time(value.as_str().ok_or_else(invalid)?)?;
            args.add(time).map_err(bind_error)
        }
        FieldType::Json => args.add(value.clone()).map_err(bind_error),
        FieldType::Media => {
            let s = value.as_str().ok_or_else(invalid)?;
            args.add(Uuid::parse_str(s).map_err(|_| invalid())?).map_err(bind_error)
        }
        FieldType::Relation => {
            if field.relation_type == Some(RelationType::One) {
                let s = value.as_str().ok_or_else(invalid)?;
                args.add(Uuid::parse_str(s).map_err(|_| invalid())?).map_err(bind_error)
            } else {
                Err(MithrilError::InvalidParams(format!(
                    "'{}' is a relation-many field and cannot be filtered or written directly",
                    field.name
                )))
            }
        }
    }
}

fn field_value_from_row(row: &PgRow, field: &Field) -> Result<Value> {
    let col = field.name.as_str();
    Ok(match field.field_type {
        FieldType::String | FieldType::Text | FieldType::Richtext | FieldType::Enum => {
            row.try_get::<Option<String>, _>(col)?.map(Value::String).unwrap_or(Value::Null)
        }
        FieldType::Int => {
            row.try_get::<Option<i32>, _>(col)?.map(|n| Value::from(n)).unwrap_or(Value::Null)
        }
        FieldType::Float => row
            .try_get::<Option<f64>, _>(col)?
            .and_then(serde_json::Number::from_f64)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        FieldType::Boolean => row.try_get::<Option<bool>, _>(col)?.map(Value::Bool).unwrap_or(Value::Null),
        FieldType::Date => row
            .try_get::<Option<NaiveDate>, _>(col)?
            .map(|d| Value::String(d.format("%Y-%m-%d").to_string()))
            .unwrap_or(Value::Null),
        FieldType::Time => row
            .try_get::<Option<NaiveTime>, _>(col)?
            .map(|t| Value::String(t.format("%H:%M:%S").to_string()))
            .unwrap_or(Value::Null),
        FieldType::Json => row.try_get::<Option<Value>, _>(col)?.unwrap_or(Value::Null),
        FieldType::Media => {
            row.try_get::<Option<Uuid>, _>(col)?.map(|u| Value::String(u.to_string())).unwrap_or(Value::Null)
        }
        FieldType::Relation => {
            if field.relation_type == Some(RelationType::One) {
                row.try_get::<Option<Uuid>, _>(col)?
                    .map(|u| Value::String(u.to_string()))
                    .unwrap_or(Value::Null)
            } else {
                Value::Null
            }
        }
    })
}

fn row_to_entry(row: &PgRow, schema: &ContentType, include_headline: bool) -> Result<Value> {
    let mut map = serde_json::Map::new();
    map.insert("id".to_string(), Value::String(row.try_get::<Uuid, _>("id")?.to_string()));
    map.insert("status".to_string(), Value::String(row.try_get::<String, _>("status")?));

    for field in schema.column_fields() {
        map.insert(field.name.clone(), field_value_from_row(row, field)?);
    }

    map.insert(
        "created_by".to_string(),
        row.try_get::<Option<Uuid>, _>("created_by")?.map(|u| Value::String(u.to_string())).unwrap_or(Value::Null),
    );
    map.insert(
        "updated_by".to_string(),
        row.try_get::<Option<Uuid>, _>("updated_by")?.map(|u| Value::String(u.to_string())).unwrap_or(Value::Null),
    );
    map.insert(
        "created_at".to_string(),
        Value::String(row.try_get::<chrono::DateTime<Utc>, _>("created_at")?.to_rfc3339()),
    );
    map.insert(
        "updated_at".to_string(),
        Value::String(row.try_get::<chrono::DateTime<Utc>, _>("updated_at")?.to_rfc3339()),
    );
    map.insert(
        "published_at".to_string(),
        row.try_get::<Option<chrono::DateTime<Utc>>, _>("published_at")?
            .map(|d| Value::String(d.to_rfc3339()))
            .unwrap_or(Value::Null),
    );

    if include_headline {
        map.insert(
            "_search_headline".to_string(),
            row.try_get::<Option<String>, _>("_search_headline")?.map(Value::String).unwrap_or(Value::Null),
        );
    }

    Ok(Value::Object(map))
}

fn projection_columns(schema: &ContentType) -> Vec<String> {
    let mut columns = vec![quote_ident("id"), quote_ident("status")];
    for field in schema.column_fields() {
        columns.push(quote_ident(&field.name));
    }
    columns.push(quote_ident("created_by"));
    columns.push(quote_ident("updated_by"));
    columns.push(quote_ident("created_at"));
    columns.push(quote_ident("updated_at"));
    columns.push(quote_ident("published_at"));
    columns
}

/// Generates SQL against the `ct_<name>` tables materialized by the
/// Schema Engine.
#[derive(Clone)]
pub struct ContentRepository {
    pool: PgPool,
}

impl ContentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn build_where_clause(
        &self,
        schema: &ContentType,
        filters: &[(String, Value)],
        published_only: bool,
        search_term: Option<&str>,
    ) -> Result<WhereClause> {
        let mut args = PgArguments::default();
        let mut clauses = Vec::new();
        let mut next_param = 1usize;

        if published_only {
            clauses.push(format!("{} = 'published'", quote_ident("status")));
        }

        for (name, value) in filters {
            let field = schema.field(name).ok_or_else(|| {
                MithrilError::InvalidParams(format!("'{}' is not a filterable field", name))
            })?;
            clauses.push(format!("{} = ${}", quote_ident(name), next_param));
            bind_field_value(&mut args, field, value)?;
            next_param += 1;
        }

        let mut search_param_index = None;
        if let Some(term) = search_term {
            search_param_index = Some(next_param);
            args.add(term.to_string()).map_err(bind_error)?;
            clauses.push(search::search_predicate(next_param));
            next_param += 1;
        }

        let sql = if clauses.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", clauses.join(" AND "))
        };

        Ok(WhereClause { sql, args, search_param_index, next_param })
    }

    /// `List(q, published_only)` (spec.md §4.7).
    #[instrument(skip(self, query), fields(content_type = %schema.name))]
    pub async fn list(&self, schema: &ContentType, query: &ListQuery) -> Result<ListResult> {
        let sort_field = search::validate_sort_field(schema, &query.sort_field)?;
        let per_page = query.per_page.clamp(1, 100);
        let page = query.page.max(1);

        let mut filters = query.filters.clone();
        filters.sort_by(|a, b| a.0.cmp(&b.0));

        let has_search = query.search.as_deref().is_some_and(|s| !s.is_empty()) && schema.has_searchable_fields();
        let search_term = has_search.then(|| query.search.as_deref().unwrap());

        let table = quote_ident(&schema.table_name());

        let count_where = self.build_where_clause(schema, &filters, query.published_only, search_term)?;
        let count_sql = format!("SELECT COUNT(*) FROM {}{}", table, count_where.sql);
        let (total,): (i64,) =
            sqlx::query_as_with(&count_sql, count_where.args).fetch_one(&self.pool).await?;

        let data_where = self.build_where_clause(schema, &filters, query.published_only, search_term)?;
        let mut projection = projection_columns(schema);
        let mut include_headline = false;
        if let Some(idx) = data_where.search_param_index {
            if let Some(headline_field) = search::first_searchable_field(schema) {
                projection.push(search::headline_projection(headline_field, idx));
                include_headline = true;
            }
        }

        let mut order_parts = Vec::new();
        if let Some(idx) = data_where.search_param_index {
            order_parts.push(search::rank_order_clause(idx));
        }
        order_parts.push(format!("{} {}", quote_ident(&sort_field), query.sort_direction.as_sql()));

        let mut args = data_where.args;
        let mut next_param = data_where.next_param;
        let limit_idx = next_param;
        args.add(per_page as i64).map_err(bind_error)?;
        next_param += 1;
        let offset_idx = next_param;
        args.add(((page - 1) as i64) * per_page as i64).map_err(bind_error)?;

        let sql = format!(
            "SELECT {} FROM {}{} ORDER BY {} LIMIT ${} OFFSET ${}",
            projection.join(", "),
            table,
            data_where.sql,
            order_parts.join(", "),
            limit_idx,
            offset_idx,
        );

        let rows = sqlx::query_with(&sql, args).fetch_all(&self.pool).await?;
        let entries =
            rows.iter().map(|row| row_to_entry(row, schema, include_headline)).collect::<Result<Vec<_>>>()?;

        Ok(ListResult { total, entries })
    }

    /// `GetByID` (spec.md §4.7). `public_only` additionally requires
    /// `status = 'published'`.
    #[instrument(skip(self), fields(content_type = %schema.name, entry_id = %id))]
    pub async fn get_by_id(&self, schema: &ContentType, id: Uuid, public_only: bool) -> Result<Value> {
        let table = quote_ident(&schema.table_name());
        let projection = projection_columns(schema).join(", ");

        let mut sql = format!("SELECT {} FROM {} WHERE {} = $1", projection, table, quote_ident("id"));
        if public_only {
            sql.push_str(&format!(" AND {} = 'published'", quote_ident("status")));
        }

        let row = sqlx::query(&sql).bind(id).fetch_optional(&self.pool).await?;
        match row {
            Some(row) => row_to_entry(&row, schema, false),
            None => Err(MithrilError::not_found(&schema.display_name, id)),
        }
    }

    /// `Insert` (spec.md §4.7). Only declared, present, non-relation-many
    /// fields are written; `created_by`/`updated_by` are appended.
    #[instrument(skip(self, data), fields(content_type = %schema.name))]
    pub async fn insert(&self, schema: &ContentType, data: &Value, created_by: Uuid) -> Result<Value> {
        let object = data.as_object().ok_or_else(|| MithrilError::InvalidParams("payload must be a JSON object".to_string()))?;

        let mut columns = Vec::new();
        let mut placeholders = Vec::new();
        let mut args = PgArguments::default();
        let mut next_param = 1usize;

        for field in schema.column_fields() {
            let Some(value) = object.get(&field.name) else { continue };
            if value.is_null() {
                continue;
            }
            columns.push(quote_ident(&field.name));
            placeholders.push(format!("${}", next_param));
            bind_field_value(&mut args, field, value)?;
            next_param += 1;
        }

        columns.push(quote_ident("created_by"));
        placeholders.push(format!("${}", next_param));
        args.add(created_by).map_err(bind_error)?;
        next_param += 1;

        columns.push(quote_ident("updated_by"));
        placeholders.push(format!("${}", next_param));
        args.add(created_by).map_err(bind_error)?;

        let table = quote_ident(&schema.table_name());
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({}) RETURNING {}",
            table,
            columns.join(", "),
            placeholders.join(", "),
            projection_columns(schema).join(", "),
        );

        let row = sqlx::query_with(&sql, args).fetch_one(&self.pool).await?;
        row_to_entry(&row, schema, false)
    }

    /// `Update` (spec.md §4.7). `updated_by`/`updated_at` are always
    /// appended, defense-in-depth alongside the `updated_at` trigger.
    #[instrument(skip(self, data), fields(content_type = %schema.name, entry_id = %id))]
    pub async fn update(&self, schema: &ContentType, id: Uuid, data: &Value, updated_by: Uuid) -> Result<Value> {
        let object = data.as_object().ok_or_else(|| MithrilError::InvalidParams("payload must be a JSON object".to_string()))?;

        let mut assignments = Vec::new();
        let mut args = PgArguments::default();
        let mut next_param = 1usize;

        for field in schema.column_fields() {
            let Some(value) = object.get(&field.name) else { continue };
            assignments.push(format!("{} = ${}", quote_ident(&field.name), next_param));
            if value.is_null() {
                // Binding an explicit SQL NULL through `bind_field_value` would
                // require a concrete type per branch; a typed None is simpler.
                args.add(Option::<String>::None).map_err(bind_error)?;
            } else {
                bind_field_value(&mut args, field, value)?;
            }
            next_param += 1;
        }

        assignments.push(format!("{} = ${}", quote_ident("updated_by"), next_param));
        args.add(updated_by).map_err(bind_error)?;
        next_param += 1;
        assignments.push(format!("{} = now()", quote_ident("updated_at")));

        let id_param = next_param;
        args.add(id).map_err(bind_error)?;

        let table = quote_ident(&schema.table_name());
        let sql = format!(
            "UPDATE {} SET {} WHERE {} = ${} RETURNING {}",
            table,
            assignments.join(", "),
            quote_ident("id"),
            id_param,
            projection_columns(schema).join(", "),
        );

        let row = sqlx::query_with(&sql, args).fetch_optional(&self.pool).await?;
        match row {
            Some(row) => row_to_entry(&row, schema, false),
            None => Err(MithrilError::not_found(&schema.display_name, id)),
        }
    }

    /// `Publish` (spec.md §4.7).
    #[instrument(skip(self), fields(content_type = %schema.name, entry_id = %id))]
    pub async fn publish(&self, schema: &ContentType, id: Uuid, updated_by: Uuid) -> Result<Value> {
        let table = quote_ident(&schema.table_name());
        let sql = format!(
            "UPDATE {} SET {} = 'published', {} = now(), {} = $1, {} = now() WHERE {} = $2 RETURNING {}",
            table,
            quote_ident("status"),
            quote_ident("published_at"),
            quote_ident("updated_by"),
            quote_ident("updated_at"),
            quote_ident("id"),
            projection_columns(schema).join(", "),
        );

        let row = sqlx::query(&sql).bind(updated_by).bind(id).fetch_optional(&self.pool).await?;
        match row {
            Some(row) => row_to_entry(&row, schema, false),
            None => Err(MithrilError::not_found(&schema.display_name, id)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::model::FieldType;

    fn title_field() -> Field {
        Field {
            name: "title".to_string(),
            field_type: FieldType::String,
            required: true,
            unique: false,
            searchable: true,
            min_length: None,
            max_length: Some(100),
            min: None,
            max: None,
            regex: None,
            values: None,
            relates_to: None,
            relation_type: None,
        }
    }

    fn schema() -> ContentType {
        ContentType {
            name: "posts".to_string(),
            display_name: "Posts".to_string(),
            public_read: true,
            fields: vec![title_field()],
            schema_hash: String::new(),
        }
    }

    #[test]
    fn projection_columns_includes_system_and_declared_fields() {
        let columns = projection_columns(&schema());
        assert!(columns.contains(&quote_ident("id")));
        assert!(columns.contains(&quote_ident("title")));
        assert!(columns.contains(&quote_ident("published_at")));
    }

    #[test]
    fn bind_field_value_rejects_relation_many() {
        let mut field = title_field();
        field.field_type = FieldType::Relation;
        field.relation_type = Some(RelationType::Many);
        let mut args = PgArguments::default();
        let result = bind_field_value(&mut args, &field, &Value::String("x".to_string()));
        assert!(result.is_err());
    }

    #[test]
    fn parse_time_accepts_both_formats() {
        assert!(parse_time("10:30").is_ok());
        assert!(parse_time("10:30:45").is_ok());
        assert!(parse_time("not-a-time").is_err());
    }
}
