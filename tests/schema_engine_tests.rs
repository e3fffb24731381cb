//! Integration tests for the Schema Engine against a real Postgres
//! instance, covering the concrete scenarios from spec.md §8.

mod common;

use mithril_cms::schema::model::{Field, FieldType, RelationType};
use mithril_cms::schema::{ContentType, SchemaEngine};

use common::TestDatabase;

fn string_field(name: &str, required: bool) -> Field {
    Field {
        name: name.to_string(),
        field_type: FieldType::String,
        required,
        unique: false,
        searchable: false,
        min_length: None,
        max_length: Some(200),
        min: None,
        max: None,
        regex: None,
        values: None,
        relates_to: None,
        relation_type: None,
    }
}

fn posts_schema(title_type: FieldType) -> ContentType {
    ContentType {
        name: "posts".to_string(),
        display_name: "Posts".to_string(),
        public_read: true,
        fields: vec![Field { field_type: title_type, ..string_field("title", false) }],
        schema_hash: "hash-v1".to_string(),
    }
}

#[tokio::test]
async fn hash_skip_applies_once_then_does_nothing() {
    let db = TestDatabase::new("hash_skip").await;
    let engine = SchemaEngine::new(db.pool().clone());

    let schema = posts_schema(FieldType::String);

    let first = engine.apply(&[schema.clone()], false).await.unwrap();
    assert_eq!(first.new_types, vec!["posts".to_string()]);
    assert_eq!(first.applied.len(), 1);

    let second = engine.apply(&[schema], false).await.unwrap();
    assert!(second.applied.is_empty());
    assert!(second.new_types.is_empty());
    assert!(second.updated_types.is_empty());
}

#[tokio::test]
async fn breaking_type_change_is_blocked_and_leaves_no_trace() {
    let db = TestDatabase::new("breaking_gate").await;
    let engine = SchemaEngine::new(db.pool().clone());

    let original = posts_schema(FieldType::Text);
    engine.apply(&[original], false).await.unwrap();

    let mut changed = posts_schema(FieldType::Int);
    changed.schema_hash = "hash-v2".to_string();

    let result = engine.apply(&[changed], false).await;
    let err = result.unwrap_err();
    let details = err.details().expect("breaking changes carry details");
    assert_eq!(details.len(), 1);
    assert!(details[0].message.contains("change base type"));

    let row: (String,) =
        sqlx::query_as("SELECT data_type FROM information_schema.columns WHERE table_name = 'ct_posts' AND column_name = 'title'")
            .fetch_one(db.pool())
            .await
            .unwrap();
    assert_eq!(row.0.to_lowercase(), "text");
}

#[tokio::test]
async fn dev_mode_allows_breaking_changes_through() {
    let db = TestDatabase::new("dev_mode_gate").await;
    let engine = SchemaEngine::new(db.pool().clone());

    let original = posts_schema(FieldType::Text);
    engine.apply(&[original], false).await.unwrap();

    let mut changed = posts_schema(FieldType::Int);
    changed.schema_hash = "hash-v2".to_string();

    let outcome = engine.apply(&[changed], true).await.unwrap();
    assert_eq!(outcome.updated_types, vec!["posts".to_string()]);
}

#[tokio::test]
async fn enum_widen_is_safe_and_narrow_is_blocked() {
    let db = TestDatabase::new("enum_diff").await;
    let engine = SchemaEngine::new(db.pool().clone());

    let mut category = Field {
        name: "category".to_string(),
        field_type: FieldType::Enum,
        values: Some(vec!["tech".to_string(), "design".to_string()]),
        ..string_field("category", false)
    };
    category.min_length = None;
    category.max_length = None;

    let v1 = ContentType {
        name: "posts".to_string(),
        display_name: "Posts".to_string(),
        public_read: true,
        fields: vec![category.clone()],
        schema_hash: "v1".to_string(),
    };
    engine.apply(&[v1], false).await.unwrap();

    let mut widened = category.clone();
    widened.values = Some(vec!["tech".to_string(), "design".to_string(), "business".to_string()]);
    let v2 = ContentType {
        name: "posts".to_string(),
        display_name: "Posts".to_string(),
        public_read: true,
        fields: vec![widened],
        schema_hash: "v2".to_string(),
    };
    engine.apply(&[v2], false).await.unwrap();

    let mut narrowed = category;
    narrowed.values = Some(vec!["tech".to_string()]);
    let v3 = ContentType {
        name: "posts".to_string(),
        display_name: "Posts".to_string(),
        public_read: true,
        fields: vec![narrowed],
        schema_hash: "v3".to_string(),
    };
    let result = engine.apply(&[v3], false).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn junction_table_is_created_for_relation_many() {
    let db = TestDatabase::new("junction_table").await;
    let engine = SchemaEngine::new(db.pool().clone());

    let tags = ContentType {
        name: "tags".to_string(),
        display_name: "Tags".to_string(),
        public_read: true,
        fields: vec![],
        schema_hash: "tags-v1".to_string(),
    };
    let posts = ContentType {
        name: "posts".to_string(),
        display_name: "Posts".to_string(),
        public_read: true,
        fields: vec![Field {
            name: "tags".to_string(),
            field_type: FieldType::Relation,
            relates_to: Some("tags".to_string()),
            relation_type: Some(RelationType::Many),
            ..string_field("tags", false)
        }],
        schema_hash: "posts-v1".to_string(),
    };

    engine.apply(&[tags, posts], false).await.unwrap();

    let exists: (bool,) = sqlx::query_as(
        "SELECT EXISTS (SELECT 1 FROM information_schema.tables WHERE table_name = 'ct_posts_tags_rel')",
    )
    .fetch_one(db.pool())
    .await
    .unwrap();
    assert!(exists.0);
}
