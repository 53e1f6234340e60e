use crate::domain::types::{ColumnType, Value};
use crate::utils::error::{CassError, Result};
use crate::utils::immutable::ImmutableMap;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// A typed column declared on a model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub alias: Option<String>,
    pub col_type: ColumnType,
    pub index: bool,
    pub primary_key: bool,
}

impl Column {
    pub fn new(col_type: ColumnType) -> Self {
        Self {
            alias: None,
            col_type,
            index: false,
            primary_key: false,
        }
    }

    /// A column stored under `alias` rather than its attribute name.
    pub fn aliased(alias: impl Into<String>, col_type: ColumnType) -> Self {
        Self {
            alias: Some(alias.into()),
            ..Self::new(col_type)
        }
    }

    pub fn index(mut self) -> Self {
        self.index = true;
        self
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    pub fn stored_name<'a>(&'a self, attr: &'a str) -> &'a str {
        self.alias.as_deref().unwrap_or(attr)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelKind {
    /// A table-like family: one row per entity, one column per attribute.
    #[default]
    Standard,
    /// One row per object; every column is a version of it.
    Timestamped,
}

/// A validated model declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelDef {
    name: String,
    column_family: String,
    kind: ModelKind,
    columns: ImmutableMap<String, Column>,
}

impl ModelDef {
    pub fn builder(name: impl Into<String>) -> ModelDefBuilder {
        ModelDefBuilder {
            name: name.into(),
            column_family: None,
            kind: ModelKind::Standard,
            columns: Vec::new(),
            declared_indexes: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn column_family(&self) -> &str {
        &self.column_family
    }

    pub fn kind(&self) -> ModelKind {
        self.kind
    }

    pub fn columns(&self) -> &ImmutableMap<String, Column> {
        &self.columns
    }

    pub fn column(&self, attr: &str) -> Option<&Column> {
        self.columns.get(attr)
    }

    /// Finds a column by the name it is stored under.
    pub fn column_by_stored_name(&self, stored: &str) -> Option<(&str, &Column)> {
        self.columns
            .iter()
            .find(|(attr, col)| col.stored_name(attr) == stored)
            .map(|(attr, col)| (attr.as_str(), col))
    }

    pub fn primary_keys(&self) -> Vec<(&str, &Column)> {
        self.columns
            .iter()
            .filter(|(_, col)| col.primary_key)
            .map(|(attr, col)| (attr.as_str(), col))
            .collect()
    }

    pub fn indexed_columns(&self) -> Vec<(&str, &Column)> {
        self.columns
            .iter()
            .filter(|(_, col)| col.index)
            .map(|(attr, col)| (attr.as_str(), col))
            .collect()
    }

    /// Stored column name to validation class, for every declared column.
    pub fn validation_classes(&self) -> BTreeMap<String, ColumnType> {
        self.columns
            .iter()
            .map(|(attr, col)| (col.stored_name(attr).to_string(), col.col_type.clone()))
            .collect()
    }

    /// Returns a copy with extra columns, e.g. from a model that extends
    /// this one. Columns of `extra` replace same-named ones.
    pub fn extend(&self, name: impl Into<String>, extra: Vec<(String, Column)>) -> Result<Self> {
        let name = name.into();
        let columns = self.columns.union(extra);
        check_stored_names(&name, &columns)?;
        check_timestamped_indexes(&name, self.kind, &columns)?;
        Ok(Self {
            column_family: name.to_lowercase(),
            name,
            kind: self.kind,
            columns,
        })
    }
}

pub struct ModelDefBuilder {
    name: String,
    column_family: Option<String>,
    kind: ModelKind,
    columns: Vec<(String, Column)>,
    declared_indexes: Vec<String>,
}

impl ModelDefBuilder {
    pub fn column(mut self, attr: impl Into<String>, column: Column) -> Self {
        self.columns.push((attr.into(), column));
        self
    }

    pub fn column_family(mut self, column_family: impl Into<String>) -> Self {
        self.column_family = Some(column_family.into());
        self
    }

    /// Marks `attr` as indexed. The attribute must be a declared column.
    pub fn declare_index(mut self, attr: impl Into<String>) -> Self {
        self.declared_indexes.push(attr.into());
        self
    }

    pub fn timestamped(mut self) -> Self {
        self.kind = ModelKind::Timestamped;
        self
    }

    pub fn kind(mut self, kind: ModelKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn build(self) -> Result<ModelDef> {
        if self.name.trim().is_empty() {
            return Err(CassError::model("model name cannot be empty"));
        }

        let mut columns: BTreeMap<String, Column> = BTreeMap::new();
        for (attr, column) in self.columns {
            if columns.insert(attr.clone(), column).is_some() {
                return Err(CassError::model(format!(
                    "{}: column '{}' declared twice",
                    self.name, attr
                )));
            }
        }

        let mut unknown = Vec::new();
        for attr in &self.declared_indexes {
            match columns.get_mut(attr) {
                Some(column) => column.index = true,
                None => unknown.push(attr.as_str()),
            }
        }
        if !unknown.is_empty() {
            return Err(CassError::model(format!(
                "Following indexes \"{}\" are not declared as fields",
                unknown.join(",")
            )));
        }

        let columns = ImmutableMap::from(columns);
        check_stored_names(&self.name, &columns)?;
        check_timestamped_indexes(&self.name, self.kind, &columns)?;

        let column_family = self
            .column_family
            .unwrap_or_else(|| self.name.to_lowercase());

        tracing::debug!(
            "Declared model {} on column family {} ({} columns)",
            self.name,
            column_family,
            columns.len()
        );

        Ok(ModelDef {
            name: self.name,
            column_family,
            kind: self.kind,
            columns,
        })
    }
}

/// Timestamped families are keyed by time UUIDs and carry no secondary
/// indexes.
fn check_timestamped_indexes(
    model: &str,
    kind: ModelKind,
    columns: &ImmutableMap<String, Column>,
) -> Result<()> {
    if kind != ModelKind::Timestamped {
        return Ok(());
    }
    let indexed: Vec<&str> = columns
        .iter()
        .filter(|(_, col)| col.index)
        .map(|(attr, _)| attr.as_str())
        .collect();
    if indexed.is_empty() {
        return Ok(());
    }
    Err(CassError::model(format!(
        "{}: timestamped models cannot index \"{}\"",
        model,
        indexed.join(",")
    )))
}

fn check_stored_names(model: &str, columns: &ImmutableMap<String, Column>) -> Result<()> {
    let mut seen = BTreeSet::new();
    for (attr, column) in columns {
        let stored = column.stored_name(attr);
        if !seen.insert(stored) {
            return Err(CassError::model(format!(
                "{}: stored column name '{}' is used twice",
                model, stored
            )));
        }
    }
    Ok(())
}

/// A row as read from a column family.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Row {
    pub key: String,
    pub columns: BTreeMap<String, Value>,
}

impl Row {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            columns: BTreeMap::new(),
        }
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.columns.insert(name.into(), value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.columns.get(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConsistencyLevel {
    One,
    Quorum,
    #[default]
    All,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteOptions {
    /// Write timestamp in microseconds; the store clock when unset.
    pub timestamp: Option<i64>,
    /// Seconds until the written columns expire.
    pub ttl: Option<u32>,
    pub write_consistency: ConsistencyLevel,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> ModelDefBuilder {
        ModelDef::builder("User")
            .column("username", Column::new(ColumnType::Utf8).primary_key())
            .column("email", Column::new(ColumnType::Utf8).index())
            .column("age", Column::aliased("user_age", ColumnType::Long))
    }

    #[test]
    fn test_column_family_defaults_to_lowercase_name() {
        let def = user().build().unwrap();
        assert_eq!(def.column_family(), "user");

        let def = user().column_family("people").build().unwrap();
        assert_eq!(def.column_family(), "people");
    }

    #[test]
    fn test_alias_is_the_stored_name() {
        let def = user().build().unwrap();
        let classes = def.validation_classes();
        assert_eq!(classes.get("user_age"), Some(&ColumnType::Long));
        assert!(!classes.contains_key("age"));
        assert_eq!(def.column_by_stored_name("user_age").unwrap().0, "age");
    }

    #[test]
    fn test_declared_index_must_be_a_column() {
        let err = user().declare_index("nickname").build().unwrap_err();
        assert!(err.to_string().contains("nickname"));
    }

    #[test]
    fn test_declared_index_marks_column_indexed() {
        let def = user().declare_index("age").build().unwrap();
        let indexed: Vec<&str> = def.indexed_columns().iter().map(|(a, _)| *a).collect();
        assert_eq!(indexed, vec!["age", "email"]);
    }

    #[test]
    fn test_timestamped_model_rejects_indexes() {
        let err = ModelDef::builder("Doc")
            .timestamped()
            .column("owner", Column::new(ColumnType::Utf8).index())
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("cannot index \"owner\""));

        let base = ModelDef::builder("Doc").timestamped().build().unwrap();
        let extra = vec![("owner".to_string(), Column::new(ColumnType::Utf8).index())];
        assert!(base.extend("SubDoc", extra).is_err());
    }

    #[test]
    fn test_duplicate_stored_names_rejected() {
        let err = user()
            .column("mail", Column::aliased("email", ColumnType::Utf8))
            .build()
            .unwrap_err();
        assert!(matches!(err, CassError::ModelError { .. }));
    }

    #[test]
    fn test_extend_keeps_base_unchanged() {
        let base = user().build().unwrap();
        let admin = base
            .extend(
                "Admin",
                vec![("level".to_string(), Column::new(ColumnType::Integer))],
            )
            .unwrap();
        assert_eq!(admin.column_family(), "admin");
        assert_eq!(admin.columns().len(), 4);
        assert_eq!(base.columns().len(), 3);
    }
}
