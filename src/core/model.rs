use crate::core::registry::Declaration;
use crate::domain::model::{ModelDef, Row, WriteOptions};
use crate::domain::ports::{ColumnFamilyStore, IndexClause, IndexExpression, KeyRange};
use crate::domain::types::{ColumnType, Value};
use crate::utils::error::{CassError, Result};
use std::collections::BTreeMap;
use std::sync::Arc;

/// A standard model bound to a keyspace and a store: one row per entity,
/// one column per declared attribute.
pub struct Model<S: ColumnFamilyStore> {
    declaration: Declaration,
    store: Arc<S>,
}

impl<S: ColumnFamilyStore> Model<S> {
    pub fn new(declaration: Declaration, store: Arc<S>) -> Self {
        Self { declaration, store }
    }

    pub fn declaration(&self) -> &Declaration {
        &self.declaration
    }

    pub fn def(&self) -> &ModelDef {
        &self.declaration.def
    }

    fn keyspace(&self) -> &str {
        &self.declaration.pool.keyspace
    }

    fn column_family(&self) -> &str {
        self.declaration.def.column_family()
    }

    pub async fn get(&self, key: &str, columns: Option<&[String]>) -> Result<Option<Row>> {
        self.store
            .get(self.keyspace(), self.column_family(), key, columns)
            .await
    }

    pub async fn multiget(&self, keys: &[String]) -> Result<Vec<Row>> {
        self.store
            .multiget(self.keyspace(), self.column_family(), keys)
            .await
    }

    pub async fn get_count(&self, key: &str) -> Result<usize> {
        self.store
            .get_count(self.keyspace(), self.column_family(), key)
            .await
    }

    pub async fn multiget_count(&self, keys: &[String]) -> Result<BTreeMap<String, usize>> {
        self.store
            .multiget_count(self.keyspace(), self.column_family(), keys)
            .await
    }

    pub async fn get_range(&self, range: &KeyRange) -> Result<Vec<Row>> {
        self.store
            .get_range(self.keyspace(), self.column_family(), range)
            .await
    }

    /// Names of the attributes that support [`Model::get_by`].
    pub fn index_lookups(&self) -> Vec<&str> {
        self.def()
            .indexed_columns()
            .into_iter()
            .map(|(attr, _)| attr)
            .collect()
    }

    /// Every row whose indexed `attribute` equals `value`, fetched in pages
    /// of [`IndexClause::count`] rows.
    pub async fn get_by(&self, attribute: &str, value: impl Into<Value>) -> Result<Vec<Row>> {
        let column = self.def().column(attribute).ok_or_else(|| {
            CassError::model(format!("{} has no attribute '{}'", self.def().name(), attribute))
        })?;
        if !column.index {
            return Err(CassError::model(format!(
                "{}.{} is not indexed",
                self.def().name(),
                attribute
            )));
        }

        let value = value.into();
        if !value.conforms_to(&column.col_type) {
            return Err(CassError::model(format!(
                "{}.{} expects {}, got {}",
                self.def().name(),
                attribute,
                column.col_type,
                value.column_type()
            )));
        }

        let stored = column.stored_name(attribute).to_string();
        tracing::debug!(
            "Index lookup on {}.{} = {}",
            self.column_family(),
            stored,
            value
        );
        let mut clause = IndexClause::new(vec![IndexExpression::equal(stored, value)]);
        let mut rows: Vec<Row> = Vec::new();
        loop {
            let page = self
                .store
                .get_indexed_slices(self.keyspace(), self.column_family(), &clause)
                .await?;
            let exhausted = page.len() < clause.count;
            // `start_key` is inclusive, so every page after the first
            // repeats the previous page's last row.
            let boundary = std::mem::take(&mut clause.start_key);
            rows.extend(
                page.into_iter()
                    .filter(|row| boundary.is_empty() || row.key != boundary),
            );
            match rows.last() {
                Some(last) if !exhausted && last.key != boundary => {
                    clause.start_key = last.key.clone();
                }
                _ => return Ok(rows),
            }
        }
    }

    /// Like [`Model::get_by`] but expects at most one match.
    pub async fn get_one_by(
        &self,
        attribute: &str,
        value: impl Into<Value>,
    ) -> Result<Option<Row>> {
        let value = value.into();
        let mut rows = self.get_by(attribute, value.clone()).await?;
        match rows.len() {
            0 => Ok(None),
            1 => Ok(rows.pop()),
            count => Err(CassError::MultipleRowsFound {
                attribute: attribute.to_string(),
                value: value.to_string(),
                count,
            }),
        }
    }

    /// Inserts a new row keyed by `key`. `columns` are keyed by attribute
    /// name and stored under each column's stored name.
    pub async fn insert(
        &self,
        key: &str,
        columns: BTreeMap<String, Value>,
        options: &WriteOptions,
    ) -> Result<()> {
        let def = self.def();
        let mut row = Row::new(key);

        for (attr, value) in columns {
            let column = def.column(&attr).ok_or_else(|| {
                CassError::model(format!("{} has no attribute '{}'", def.name(), attr))
            })?;
            if !value.conforms_to(&column.col_type) {
                return Err(CassError::model(format!(
                    "{}.{} expects {}, got {}",
                    def.name(),
                    attr,
                    column.col_type,
                    value.column_type()
                )));
            }
            row.columns.insert(column.stored_name(&attr).to_string(), value);
        }

        for (attr, column) in def.primary_keys() {
            let stored = column.stored_name(attr);
            if row.columns.contains_key(stored) {
                continue;
            }
            let key_value = match column.col_type {
                ColumnType::Utf8 => Some(Value::Utf8(key.to_string())),
                ColumnType::Ascii if key.is_ascii() => Some(Value::Ascii(key.to_string())),
                _ => None,
            };
            if let Some(value) = key_value {
                row.columns.insert(stored.to_string(), value);
            }
        }

        if self.get_count(key).await? > 0 {
            return Err(CassError::RowExists {
                column_family: self.column_family().to_string(),
                key: key.to_string(),
            });
        }

        tracing::debug!(
            "Inserting {} columns into {}[{}]",
            row.columns.len(),
            self.column_family(),
            key
        );
        self.store
            .insert(self.keyspace(), self.column_family(), &row, options)
            .await
    }
}
