//! # Schema Engine
//!
//! Orchestrates the Diff Engine against the live `content_types` registry,
//! applies safe changes transactionally, and gates breaking changes behind
//! `dev_mode` (spec.md §4.5).

use std::path::Path;

use sqlx::{PgPool, Postgres, Row, Transaction};
use tracing::{info, instrument, warn};

use crate::errors::{ErrorDetail, MithrilError, Result};
use crate::observability::metrics;
use crate::schema::diff::{diff_schema, Change};
use crate::schema::loader::load_schemas;
use crate::schema::model::{ContentType, Field};
use crate::schema::validator::validate_schemas;

/// Result of a single `Apply` call.
#[derive(Debug, Default)]
pub struct ApplyOutcome {
    pub applied: Vec<Change>,
    pub new_types: Vec<String>,
    pub updated_types: Vec<String>,
}

/// Result of a `Refresh` call: reload from disk, validate, apply.
#[derive(Debug, Default)]
pub struct RefreshOutcome {
    pub applied: Vec<Change>,
    pub new_types: Vec<String>,
    pub updated_types: Vec<String>,
}

pub struct SchemaEngine {
    pool: PgPool,
}

impl SchemaEngine {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Read the previously applied definition of a content type from the
    /// `content_types` registry, if one exists.
    #[instrument(skip(self), name = "db_current_content_type")]
    pub async fn current_content_type(&self, name: &str) -> Result<Option<ContentType>> {
        let row = sqlx::query(
            r#"SELECT name, display_name, public_read, fields, schema_hash
               FROM content_types WHERE name = $1"#,
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let fields_json: serde_json::Value = row.try_get("fields")?;
        let fields: Vec<Field> = serde_json::from_value(fields_json)?;

        Ok(Some(ContentType {
            name: row.try_get("name")?,
            display_name: row.try_get("display_name")?,
            public_read: row.try_get("public_read")?,
            fields,
            schema_hash: row.try_get("schema_hash")?,
        }))
    }

    /// Apply a loaded, validated set of schemas. Schemas whose hash is
    /// unchanged from the registry are skipped entirely — no diff is even
    /// computed for them (spec.md §8 scenario 1). If any resulting change
    /// is breaking and `dev_mode` is false, no database modification is
    /// made and `BreakingChanges` is returned enumerating every blocked
    /// change across every schema.
    #[instrument(skip(self, schemas), fields(schema_count = schemas.len()))]
    pub async fn apply(&self, schemas: &[ContentType], dev_mode: bool) -> Result<ApplyOutcome> {
        let mut all_changes: Vec<Change> = Vec::new();
        let mut to_upsert: Vec<&ContentType> = Vec::new();
        let mut new_types = Vec::new();
        let mut updated_types = Vec::new();

        for schema in schemas {
            let existing = self.current_content_type(&schema.name).await?;

            match &existing {
                Some(current) if current.schema_hash == schema.schema_hash => {
                    continue;
                }
                Some(_) => updated_types.push(schema.name.clone()),
                None => new_types.push(schema.name.clone()),
            }

            let changes = diff_schema(schema, existing.as_ref());
            to_upsert.push(schema);
            all_changes.extend(changes);
        }

        for change in &all_changes {
            metrics::schema_apply(change.safe);
        }

        let breaking: Vec<&Change> = all_changes.iter().filter(|c| !c.safe).collect();
        if !breaking.is_empty() && !dev_mode {
            let details = breaking
                .iter()
                .map(|c| ErrorDetail::new(c.column.clone().unwrap_or_else(|| c.table.clone()), c.detail.clone()))
                .collect();
            warn!(blocked = breaking.len(), "schema apply blocked by breaking changes");
            return Err(MithrilError::breaking_changes(details));
        }

        if all_changes.is_empty() {
            info!("schema apply: nothing to do, all schemas unchanged");
            return Ok(ApplyOutcome::default());
        }

        let mut tx: Transaction<'_, Postgres> = self.pool.begin().await?;

        for change in &all_changes {
            for statement in &change.sql {
                sqlx::query(statement).execute(&mut *tx).await?;
            }
        }

        for schema in &to_upsert {
            let fields_json = serde_json::to_value(&schema.fields)?;
            sqlx::query(
                r#"INSERT INTO content_types (name, display_name, public_read, fields, schema_hash)
                   VALUES ($1, $2, $3, $4, $5)
                   ON CONFLICT (name) DO UPDATE SET
                     display_name = EXCLUDED.display_name,
                     public_read = EXCLUDED.public_read,
                     fields = EXCLUDED.fields,
                     schema_hash = EXCLUDED.schema_hash,
                     updated_at = now()"#,
            )
            .bind(&schema.name)
            .bind(&schema.display_name)
            .bind(schema.public_read)
            .bind(&fields_json)
            .bind(&schema.schema_hash)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        info!(
            applied = all_changes.len(),
            new_types = new_types.len(),
            updated_types = updated_types.len(),
            "schema apply committed"
        );

        Ok(ApplyOutcome { applied: all_changes, new_types, updated_types })
    }

    /// Reload schemas from `dir`, validate them, and apply. `force`
    /// bypasses the breaking-change gate exactly like `dev_mode` on
    /// `apply` — in non-force mode, any breaking change aborts the whole
    /// refresh with no partial database state.
    #[instrument(skip(self), fields(dir = %dir.display()))]
    pub async fn refresh(&self, dir: &Path, force: bool) -> Result<RefreshOutcome> {
        let schemas = load_schemas(dir)?;
        validate_schemas(&schemas)?;

        let outcome = self.apply(&schemas, force).await?;

        Ok(RefreshOutcome {
            applied: outcome.applied,
            new_types: outcome.new_types,
            updated_types: outcome.updated_types,
        })
    }
}
