use cassobjects::{Builder, CqlScript, PoolRegistry, SchemaConfig};

const SCHEMA: &str = r#"
keyspace = "Blog"

[[models]]
name = "Post"
indexes = ["author"]

[models.columns.slug]
type = "UTF8Type"
primary_key = true

[models.columns.author]
type = "UTF8Type"

[models.columns.published]
type = "DateType"
alias = "published_at"

[[models]]
name = "PostRevision"
kind = "timestamped"
"#;

#[tokio::test]
async fn test_schema_file_to_cql() {
    let schema = SchemaConfig::from_toml_str(SCHEMA).unwrap();
    let registry = PoolRegistry::new();
    let declarations = schema.declarations(&registry).unwrap();

    let script = CqlScript::new();
    let report = Builder::create(&script, &declarations, false).await.unwrap();
    assert_eq!(report.created, vec!["post", "postrevision"]);

    let statements = script.statements();
    let ddl: Vec<&String> = statements.iter().filter(|s| !s.starts_with("--")).collect();
    assert_eq!(ddl.len(), 3);
    assert_eq!(
        ddl[0],
        "CREATE TABLE IF NOT EXISTS \"Blog\".\"post\" (\"author\" text, \
         \"published_at\" timestamp, \"slug\" text PRIMARY KEY) \
         WITH comment = 'Generated by cassobjects';"
    );
    assert_eq!(
        ddl[1],
        "CREATE INDEX IF NOT EXISTS \"post_author_index\" ON \"Blog\".\"post\" (\"author\");"
    );
    assert!(ddl[2].contains("\"postrevision\" (key text, column1 timeuuid, value blob"));
}

#[tokio::test]
async fn test_existing_families_skip_or_force() {
    let schema = SchemaConfig::from_toml_str(SCHEMA).unwrap();
    let registry = PoolRegistry::new();
    let declarations = schema.declarations(&registry).unwrap();

    let script = CqlScript::new().with_existing("Blog", &["post"]);
    let report = Builder::create(&script, &declarations, false).await.unwrap();
    assert_eq!(report.skipped, vec!["post"]);
    assert_eq!(report.created, vec!["postrevision"]);

    let script = CqlScript::new().with_existing("Blog", &["post"]);
    let report = Builder::create(&script, &declarations, true).await.unwrap();
    assert_eq!(report.dropped, vec!["post"]);
    assert!(script
        .render()
        .contains("DROP TABLE IF EXISTS \"Blog\".\"post\";\nCREATE TABLE"));
}
