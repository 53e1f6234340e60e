use cassobjects::core::registry::DEFAULT_KEYSPACE;
use cassobjects::domain::ports::KeyRange;
use cassobjects::domain::types::compare_time_uuids;
use cassobjects::{
    Builder, CassError, Column, ColumnType, MemoryCluster, Model, ModelDef, PoolRegistry,
    TimestampedModel, Value, WriteOptions,
};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::Arc;
use uuid::{NoContext, Timestamp, Uuid};

const NODE: [u8; 6] = [1, 2, 3, 4, 5, 6];

fn user_def() -> ModelDef {
    ModelDef::builder("User")
        .column("username", Column::new(ColumnType::Utf8).primary_key())
        .column("email", Column::aliased("mail", ColumnType::Utf8).index())
        .column("city", Column::new(ColumnType::Utf8))
        .column("age", Column::new(ColumnType::Long))
        .declare_index("city")
        .build()
        .unwrap()
}

async fn setup() -> (MemoryCluster, Model<MemoryCluster>) {
    let cluster = MemoryCluster::new();
    cluster.create_keyspace(DEFAULT_KEYSPACE).await.unwrap();

    let registry = PoolRegistry::new();
    let model = registry
        .declare_model(user_def(), DEFAULT_KEYSPACE, &[], Arc::new(cluster.clone()))
        .unwrap();

    Builder::create(&cluster, [model.declaration()], false)
        .await
        .unwrap();
    (cluster, model)
}

fn columns(entries: &[(&str, Value)]) -> BTreeMap<String, Value> {
    entries
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

async fn insert_user(model: &Model<MemoryCluster>, name: &str, email: &str, city: &str) {
    model
        .insert(
            name,
            columns(&[
                ("email", email.into()),
                ("city", city.into()),
                ("age", Value::Long(30)),
            ]),
            &WriteOptions::default(),
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn test_builder_creates_family_and_indexes() {
    let (cluster, _model) = setup().await;

    let def = cluster
        .column_family_def(DEFAULT_KEYSPACE, "user")
        .await
        .unwrap();
    assert_eq!(def.comparator_type, ColumnType::Utf8);
    assert_eq!(def.comment, "Generated by cassobjects");
    assert_eq!(def.key_alias.as_deref(), Some("username"));
    let names: Vec<&str> = def
        .column_validation_classes
        .keys()
        .map(String::as_str)
        .collect();
    assert_eq!(names, vec!["age", "city", "mail", "username"]);

    let indexes = cluster.indexes(DEFAULT_KEYSPACE, "user").await.unwrap();
    assert_eq!(indexes.get("mail").map(String::as_str), Some("user_mail_index"));
    assert_eq!(indexes.get("city").map(String::as_str), Some("user_city_index"));
    assert_eq!(cluster.open_sessions(), 0);
}

#[tokio::test]
async fn test_builder_skips_existing_unless_forced() {
    let (cluster, model) = setup().await;
    insert_user(&model, "alice", "alice@example.com", "Paris").await;

    let report = Builder::create(&cluster, [model.declaration()], false)
        .await
        .unwrap();
    assert_eq!(report.skipped, vec!["user"]);
    assert!(report.created.is_empty());
    assert_eq!(model.get_count("alice").await.unwrap(), 4);

    let report = Builder::create(&cluster, [model.declaration()], true)
        .await
        .unwrap();
    assert_eq!(report.dropped, vec!["user"]);
    assert_eq!(report.created, vec!["user"]);
    assert_eq!(report.indexes.len(), 2);
    assert_eq!(model.get_count("alice").await.unwrap(), 0);
    assert_eq!(cluster.open_sessions(), 0);
}

#[tokio::test]
async fn test_builder_closes_session_on_failure() {
    let cluster = MemoryCluster::new();
    let registry = PoolRegistry::new();
    // Keyspace was never created, so listing column families fails.
    let declaration = registry
        .declare(user_def(), "Missing", &["localhost:9160".to_string()])
        .unwrap();

    let result = Builder::create(&cluster, [&declaration], false).await;
    assert!(matches!(result, Err(CassError::StoreError { .. })));
    assert_eq!(cluster.open_sessions(), 0);
}

#[tokio::test]
async fn test_builder_rejects_model_without_primary_key() {
    let cluster = MemoryCluster::new();
    cluster.create_keyspace("ks").await.unwrap();
    let registry = PoolRegistry::new();
    let def = ModelDef::builder("Comment")
        .column("body", Column::new(ColumnType::Utf8))
        .build()
        .unwrap();
    let declaration = registry.declare(def, "ks", &[]).unwrap();

    let err = Builder::create(&cluster, [&declaration], false)
        .await
        .unwrap_err();
    assert!(matches!(err, CassError::BuilderError { .. }));
}

#[tokio::test]
async fn test_existing_family_skipped_before_layout_check() {
    let (cluster, _model) = setup().await;
    let registry = PoolRegistry::new();
    // Same column family as `User`, but without a primary key.
    let keyless = ModelDef::builder("User")
        .column("city", Column::new(ColumnType::Utf8))
        .build()
        .unwrap();
    let declaration = registry.declare(keyless, DEFAULT_KEYSPACE, &[]).unwrap();

    let report = Builder::create(&cluster, [&declaration], false)
        .await
        .unwrap();
    assert_eq!(report.skipped, vec!["user"]);

    let err = Builder::create(&cluster, [&declaration], true)
        .await
        .unwrap_err();
    assert!(matches!(err, CassError::BuilderError { .. }));
    // The existing family is kept when the replacement is invalid.
    assert!(cluster.column_family_def(DEFAULT_KEYSPACE, "user").await.is_ok());
    assert_eq!(cluster.open_sessions(), 0);
}

#[tokio::test]
async fn test_insert_fills_primary_key_and_rejects_duplicates() {
    let (_cluster, model) = setup().await;
    insert_user(&model, "alice", "alice@example.com", "Paris").await;

    let row = model.get("alice", None).await.unwrap().unwrap();
    assert_eq!(row.get("username"), Some(&Value::from("alice")));
    assert_eq!(row.get("mail"), Some(&Value::from("alice@example.com")));

    let err = model
        .insert(
            "alice",
            columns(&[("city", "Lyon".into())]),
            &WriteOptions::default(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, CassError::RowExists { .. }));
}

#[tokio::test]
async fn test_expired_row_can_be_inserted_again() {
    let (_cluster, model) = setup().await;
    let short = WriteOptions {
        ttl: Some(1),
        ..Default::default()
    };
    model
        .insert("temp", columns(&[("city", "Paris".into())]), &short)
        .await
        .unwrap();
    let err = model
        .insert("temp", columns(&[("city", "Lyon".into())]), &short)
        .await
        .unwrap_err();
    assert!(matches!(err, CassError::RowExists { .. }));

    tokio::time::sleep(std::time::Duration::from_millis(1100)).await;
    assert_eq!(model.get_count("temp").await.unwrap(), 0);
    model
        .insert(
            "temp",
            columns(&[("city", "Lyon".into())]),
            &WriteOptions::default(),
        )
        .await
        .unwrap();
    let row = model.get("temp", None).await.unwrap().unwrap();
    assert_eq!(row.get("city"), Some(&Value::from("Lyon")));
}

#[tokio::test]
async fn test_insert_validates_columns() {
    let (_cluster, model) = setup().await;

    let unknown = model
        .insert(
            "bob",
            columns(&[("nickname", "b".into())]),
            &WriteOptions::default(),
        )
        .await;
    assert!(matches!(unknown, Err(CassError::ModelError { .. })));

    let wrong_type = model
        .insert(
            "bob",
            columns(&[("age", "old".into())]),
            &WriteOptions::default(),
        )
        .await;
    assert!(matches!(wrong_type, Err(CassError::ModelError { .. })));
}

#[tokio::test]
async fn test_index_lookups() {
    let (_cluster, model) = setup().await;
    insert_user(&model, "alice", "alice@example.com", "Paris").await;
    insert_user(&model, "bob", "bob@example.com", "Paris").await;
    insert_user(&model, "carol", "carol@example.com", "Lyon").await;

    assert_eq!(model.index_lookups(), vec!["city", "email"]);

    let parisians = model.get_by("city", "Paris").await.unwrap();
    let keys: Vec<&str> = parisians.iter().map(|r| r.key.as_str()).collect();
    assert_eq!(keys, vec!["alice", "bob"]);

    let bob = model.get_one_by("email", "bob@example.com").await.unwrap();
    assert_eq!(bob.unwrap().key, "bob");

    assert!(model.get_one_by("city", "Nantes").await.unwrap().is_none());

    let err = model.get_one_by("city", "Paris").await.unwrap_err();
    assert!(matches!(err, CassError::MultipleRowsFound { count: 2, .. }));

    let err = model.get_by("age", Value::Long(30)).await.unwrap_err();
    assert!(err.to_string().contains("not indexed"));
}

#[tokio::test]
async fn test_get_by_returns_every_match_across_pages() {
    let (_cluster, model) = setup().await;
    for i in 0..150 {
        let name = format!("user-{:03}", i);
        insert_user(&model, &name, &format!("{}@example.com", name), "Paris").await;
    }
    insert_user(&model, "zoe", "zoe@example.com", "Lyon").await;

    let parisians = model.get_by("city", "Paris").await.unwrap();
    assert_eq!(parisians.len(), 150);
    let keys: Vec<&str> = parisians.iter().map(|r| r.key.as_str()).collect();
    let mut unique = keys.clone();
    unique.dedup();
    assert_eq!(unique.len(), 150);
    assert_eq!(keys.first(), Some(&"user-000"));
    assert_eq!(keys.last(), Some(&"user-149"));
}

#[tokio::test]
async fn test_read_operations() {
    let (_cluster, model) = setup().await;
    for name in ["alice", "bob", "carol", "dave"] {
        insert_user(&model, name, &format!("{}@example.com", name), "Paris").await;
    }

    let keys = vec!["carol".to_string(), "zed".to_string(), "alice".to_string()];
    let rows = model.multiget(&keys).await.unwrap();
    let found: Vec<&str> = rows.iter().map(|r| r.key.as_str()).collect();
    assert_eq!(found, vec!["carol", "alice"]);

    let counts = model.multiget_count(&keys).await.unwrap();
    assert_eq!(counts.get("carol"), Some(&4));
    assert!(!counts.contains_key("zed"));

    let range = KeyRange {
        start: Some("b".to_string()),
        finish: None,
        limit: Some(2),
    };
    let rows = model.get_range(&range).await.unwrap();
    let found: Vec<&str> = rows.iter().map(|r| r.key.as_str()).collect();
    assert_eq!(found, vec!["bob", "carol"]);
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Document {
    title: String,
    body: String,
}

#[tokio::test]
async fn test_timestamped_model_keeps_history() {
    let cluster = MemoryCluster::new();
    cluster.create_keyspace("docs").await.unwrap();
    let registry = PoolRegistry::new();
    let def = ModelDef::builder("Document").timestamped().build().unwrap();
    let model: TimestampedModel<MemoryCluster> = registry
        .declare_timestamped_model(def, "docs", &[], Arc::new(cluster.clone()))
        .unwrap();
    Builder::create(&cluster, [model.declaration()], false)
        .await
        .unwrap();

    let first = Document {
        title: "Draft".to_string(),
        body: "hello".to_string(),
    };
    let second = Document {
        title: "Final".to_string(),
        body: "hello, world".to_string(),
    };

    // The earlier version sorts after the later one as a string.
    let v1 = Uuid::new_v1(Timestamp::from_unix(NoContext, 1_700_000_421, 0), &NODE);
    let v2 = Uuid::new_v1(Timestamp::from_unix(NoContext, 1_700_000_422, 0), &NODE);
    assert!(v1.to_string() > v2.to_string());
    model.push_at("doc-1", v2, &second).await.unwrap();
    model.push_at("doc-1", v1, &first).await.unwrap();

    let latest: Option<Document> = model.get_one_by_rowkey("doc-1").await.unwrap();
    assert_eq!(latest, Some(second.clone()));

    let history: Vec<(Uuid, Document)> = model.history("doc-1").await.unwrap();
    assert_eq!(history, vec![(v1, first), (v2, second)]);
    assert_eq!(model.version_count("doc-1").await.unwrap(), 2);

    let missing: Option<Document> = model.get_one_by_rowkey("doc-2").await.unwrap();
    assert!(missing.is_none());
}

#[tokio::test]
async fn test_timestamped_push_generates_ordered_versions() {
    let cluster = MemoryCluster::new();
    cluster.create_keyspace("docs").await.unwrap();
    let registry = PoolRegistry::new();
    let def = ModelDef::builder("Note").timestamped().build().unwrap();
    let model = registry
        .declare_timestamped_model(def, "docs", &[], Arc::new(cluster.clone()))
        .unwrap();
    Builder::create(&cluster, [model.declaration()], false)
        .await
        .unwrap();

    let first = model.push("n", &1u32).await.unwrap();
    let second = model.push("n", &2u32).await.unwrap();
    assert_eq!(first.get_version_num(), 1);
    assert_eq!(second.get_version_num(), 1);
    assert_eq!(compare_time_uuids(&first, &second), Ordering::Less);

    let def = cluster.column_family_def("docs", "note").await.unwrap();
    assert_eq!(def.comparator_type, ColumnType::TimeUuid);

    let latest: Option<u32> = model.get_one_by_rowkey("n").await.unwrap();
    assert_eq!(latest, Some(2));
}

#[tokio::test]
async fn test_timestamped_versions_must_be_time_uuids() {
    let cluster = MemoryCluster::new();
    cluster.create_keyspace("docs").await.unwrap();
    let registry = PoolRegistry::new();
    let def = ModelDef::builder("Note").timestamped().build().unwrap();
    let model = registry
        .declare_timestamped_model(def, "docs", &[], Arc::new(cluster.clone()))
        .unwrap();
    Builder::create(&cluster, [model.declaration()], false)
        .await
        .unwrap();

    let random = Uuid::parse_str("9b2f4c8e-3d1a-4f6b-8c2e-5a7d9e0f1b3c").unwrap();
    let err = model.push_at("n", random, &1u32).await.unwrap_err();
    assert!(matches!(err, CassError::ModelError { .. }));
    assert_eq!(model.version_count("n").await.unwrap(), 0);
}

#[tokio::test]
async fn test_declare_rejects_wrong_kind() {
    let cluster = Arc::new(MemoryCluster::new());
    let registry = PoolRegistry::new();
    let timestamped = ModelDef::builder("Log").timestamped().build().unwrap();
    assert!(registry
        .declare_model(timestamped, "ks", &[], Arc::clone(&cluster))
        .is_err());
    assert!(registry
        .declare_timestamped_model(user_def(), "ks", &[], cluster)
        .is_err());
}
