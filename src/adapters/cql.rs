use crate::domain::ports::{ColumnFamilyDef, SchemaConnector, SchemaManager};
use crate::domain::types::ColumnType;
use crate::utils::error::Result;
use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex};

#[derive(Debug, Default)]
struct Script {
    statements: Vec<String>,
    /// Column families known per keyspace, as created or dropped by the script.
    known: BTreeMap<String, BTreeSet<String>>,
}

/// Records schema changes as a CQL script instead of applying them.
///
/// Column families listed with [`CqlScript::with_existing`] are reported as
/// already present, so the builder's skip/force decisions show up in the
/// generated script.
#[derive(Debug, Clone, Default)]
pub struct CqlScript {
    script: Arc<Mutex<Script>>,
}

impl CqlScript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_existing(self, keyspace: &str, column_families: &[&str]) -> Self {
        if let Ok(mut script) = self.script.lock() {
            script
                .known
                .entry(keyspace.to_string())
                .or_default()
                .extend(column_families.iter().map(|cf| cf.to_string()));
        }
        self
    }

    pub fn statements(&self) -> Vec<String> {
        self.script
            .lock()
            .map(|script| script.statements.clone())
            .unwrap_or_default()
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        for statement in self.statements() {
            out.push_str(&statement);
            out.push('\n');
        }
        out
    }

    fn push(&self, statement: String, update: impl FnOnce(&mut BTreeMap<String, BTreeSet<String>>)) {
        if let Ok(mut script) = self.script.lock() {
            tracing::debug!("{}", statement);
            script.statements.push(statement);
            update(&mut script.known);
        }
    }
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn quote_literal(text: &str) -> String {
    format!("'{}'", text.replace('\'', "''"))
}

/// Static families become one CQL column per declared column. Families with
/// a default validation class are dynamic: one clustering column holds the
/// column name and one the value.
pub fn create_table_statement(keyspace: &str, def: &ColumnFamilyDef) -> String {
    let table = format!("{}.{}", quote_ident(keyspace), quote_ident(&def.name));

    let body = match &def.default_validation_class {
        Some(value_type) => format!(
            "key text, column1 {}, value {}, PRIMARY KEY (key, column1)",
            def.comparator_type.cql_type(),
            value_type.cql_type()
        ),
        None => {
            let key_alias = def
                .key_alias
                .as_deref()
                .filter(|alias| def.column_validation_classes.contains_key(*alias));
            let mut columns = Vec::new();
            if key_alias.is_none() {
                columns.push("key text PRIMARY KEY".to_string());
            }
            for (name, col_type) in &def.column_validation_classes {
                let suffix = if Some(name.as_str()) == key_alias {
                    " PRIMARY KEY"
                } else {
                    ""
                };
                columns.push(format!("{} {}{}", quote_ident(name), col_type.cql_type(), suffix));
            }
            columns.join(", ")
        }
    };

    let mut options = vec![format!("comment = {}", quote_literal(&def.comment))];
    if def.default_validation_class.is_some() {
        options.insert(0, "CLUSTERING ORDER BY (column1 ASC)".to_string());
    }

    format!(
        "CREATE TABLE IF NOT EXISTS {} ({}) WITH {};",
        table,
        body,
        options.join(" AND ")
    )
}

#[async_trait]
impl SchemaConnector for CqlScript {
    async fn connect(&self, server: &str) -> Result<Box<dyn SchemaManager>> {
        self.push(format!("-- session: {}", server), |_| {});
        Ok(Box::new(self.clone()))
    }
}

#[async_trait]
impl SchemaManager for CqlScript {
    async fn column_families(&self, keyspace: &str) -> Result<Vec<String>> {
        Ok(self
            .script
            .lock()
            .ok()
            .and_then(|script| script.known.get(keyspace).cloned())
            .map(|set| set.into_iter().collect())
            .unwrap_or_default())
    }

    async fn create_column_family(&self, keyspace: &str, def: &ColumnFamilyDef) -> Result<()> {
        let statement = create_table_statement(keyspace, def);
        self.push(statement, |known| {
            known
                .entry(keyspace.to_string())
                .or_default()
                .insert(def.name.clone());
        });
        Ok(())
    }

    async fn drop_column_family(&self, keyspace: &str, column_family: &str) -> Result<()> {
        let statement = format!(
            "DROP TABLE IF EXISTS {}.{};",
            quote_ident(keyspace),
            quote_ident(column_family)
        );
        self.push(statement, |known| {
            if let Some(families) = known.get_mut(keyspace) {
                families.remove(column_family);
            }
        });
        Ok(())
    }

    async fn create_index(
        &self,
        keyspace: &str,
        column_family: &str,
        column: &str,
        _value_type: &ColumnType,
        index_name: &str,
    ) -> Result<()> {
        let statement = format!(
            "CREATE INDEX IF NOT EXISTS {} ON {}.{} ({});",
            quote_ident(index_name),
            quote_ident(keyspace),
            quote_ident(column_family),
            quote_ident(column)
        );
        self.push(statement, |_| {});
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}
