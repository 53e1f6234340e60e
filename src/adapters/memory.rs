//! An in-process cluster holding keyspaces, column families and secondary
//! indexes. It enforces the same rules a real cluster would for the
//! operations the crate uses: declared validation classes, indexed
//! equality for index clauses and last-write-wins timestamps.

use crate::domain::model::{Row, WriteOptions};
use crate::domain::ports::{
    ColumnFamilyDef, ColumnFamilyStore, IndexClause, IndexExpression, IndexOperator, KeyRange,
    SchemaConnector, SchemaManager,
};
use crate::domain::types::{is_time_uuid, ColumnType, Value};
use crate::utils::error::{CassError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Debug, Clone)]
struct Cell {
    value: Value,
    timestamp: i64,
    expires_at: Option<DateTime<Utc>>,
}

impl Cell {
    fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_none_or(|at| at > now)
    }
}

#[derive(Debug)]
struct Family {
    def: ColumnFamilyDef,
    /// Column name to index name.
    indexes: BTreeMap<String, String>,
    rows: BTreeMap<String, BTreeMap<String, Cell>>,
}

impl Family {
    fn live_row(&self, key: &str, now: DateTime<Utc>) -> Option<Row> {
        let cells = self.rows.get(key)?;
        let columns: BTreeMap<String, Value> = cells
            .iter()
            .filter(|(_, cell)| cell.is_live(now))
            .map(|(name, cell)| (name.clone(), cell.value.clone()))
            .collect();
        if columns.is_empty() {
            return None;
        }
        Some(Row {
            key: key.to_string(),
            columns,
        })
    }

    fn validator_for(&self, column: &str) -> Option<&ColumnType> {
        self.def
            .column_validation_classes
            .get(column)
            .or(self.def.default_validation_class.as_ref())
    }
}

#[derive(Debug, Default)]
struct ClusterState {
    keyspaces: BTreeMap<String, BTreeMap<String, Family>>,
}

impl ClusterState {
    fn keyspace(&self, keyspace: &str) -> Result<&BTreeMap<String, Family>> {
        self.keyspaces
            .get(keyspace)
            .ok_or_else(|| CassError::store(format!("keyspace '{}' does not exist", keyspace)))
    }

    fn keyspace_mut(&mut self, keyspace: &str) -> Result<&mut BTreeMap<String, Family>> {
        self.keyspaces
            .get_mut(keyspace)
            .ok_or_else(|| CassError::store(format!("keyspace '{}' does not exist", keyspace)))
    }

    fn family(&self, keyspace: &str, column_family: &str) -> Result<&Family> {
        self.keyspace(keyspace)?
            .get(column_family)
            .ok_or_else(|| CassError::ColumnFamilyNotFound {
                keyspace: keyspace.to_string(),
                column_family: column_family.to_string(),
            })
    }

    fn family_mut(&mut self, keyspace: &str, column_family: &str) -> Result<&mut Family> {
        self.keyspace_mut(keyspace)?
            .get_mut(column_family)
            .ok_or_else(|| CassError::ColumnFamilyNotFound {
                keyspace: keyspace.to_string(),
                column_family: column_family.to_string(),
            })
    }
}

/// Shared handle to an in-memory cluster. Clones see the same data.
#[derive(Debug, Clone, Default)]
pub struct MemoryCluster {
    state: Arc<RwLock<ClusterState>>,
    open_sessions: Arc<AtomicUsize>,
}

impl MemoryCluster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keyspaces are created outside the schema builder.
    pub async fn create_keyspace(&self, keyspace: &str) -> Result<()> {
        let mut state = self.state.write().await;
        if state.keyspaces.contains_key(keyspace) {
            return Err(CassError::store(format!(
                "keyspace '{}' already exists",
                keyspace
            )));
        }
        state.keyspaces.insert(keyspace.to_string(), BTreeMap::new());
        tracing::debug!("Created keyspace {}", keyspace);
        Ok(())
    }

    pub async fn column_family_def(
        &self,
        keyspace: &str,
        column_family: &str,
    ) -> Result<ColumnFamilyDef> {
        let state = self.state.read().await;
        Ok(state.family(keyspace, column_family)?.def.clone())
    }

    /// Column name to index name for a column family.
    pub async fn indexes(
        &self,
        keyspace: &str,
        column_family: &str,
    ) -> Result<BTreeMap<String, String>> {
        let state = self.state.read().await;
        Ok(state.family(keyspace, column_family)?.indexes.clone())
    }

    /// Schema sessions opened through [`SchemaConnector`] and not yet closed.
    pub fn open_sessions(&self) -> usize {
        self.open_sessions.load(AtomicOrdering::SeqCst)
    }
}

fn compare_values(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::Ascii(a) | Value::Utf8(a), Value::Ascii(b) | Value::Utf8(b)) => Some(a.cmp(b)),
        (
            Value::Long(a) | Value::Integer(a) | Value::Counter(a),
            Value::Long(b) | Value::Integer(b) | Value::Counter(b),
        ) => Some(a.cmp(b)),
        (Value::Double(a), Value::Double(b)) => a.partial_cmp(b),
        (Value::Float(a), Value::Float(b)) => a.partial_cmp(b),
        (Value::Date(a), Value::Date(b)) => Some(a.cmp(b)),
        (Value::Boolean(a), Value::Boolean(b)) => Some(a.cmp(b)),
        (Value::Uuid(a), Value::Uuid(b)) => Some(a.cmp(b)),
        (Value::Bytes(a), Value::Bytes(b)) => Some(a.cmp(b)),
        _ => (left == right).then_some(Ordering::Equal),
    }
}

fn matches_expression(row: &Row, expression: &IndexExpression) -> bool {
    let Some(value) = row.columns.get(&expression.column) else {
        return false;
    };
    let Some(ordering) = compare_values(value, &expression.value) else {
        return false;
    };
    match expression.op {
        IndexOperator::Eq => ordering == Ordering::Equal,
        IndexOperator::Gt => ordering == Ordering::Greater,
        IndexOperator::Gte => ordering != Ordering::Less,
        IndexOperator::Lt => ordering == Ordering::Less,
        IndexOperator::Lte => ordering != Ordering::Greater,
    }
}

fn micros_now() -> i64 {
    Utc::now().timestamp_micros()
}

#[async_trait]
impl ColumnFamilyStore for MemoryCluster {
    async fn get(
        &self,
        keyspace: &str,
        column_family: &str,
        key: &str,
        columns: Option<&[String]>,
    ) -> Result<Option<Row>> {
        let state = self.state.read().await;
        let family = state.family(keyspace, column_family)?;
        let Some(mut row) = family.live_row(key, Utc::now()) else {
            return Ok(None);
        };
        if let Some(wanted) = columns {
            row.columns.retain(|name, _| wanted.contains(name));
            if row.columns.is_empty() {
                return Ok(None);
            }
        }
        Ok(Some(row))
    }

    async fn multiget(
        &self,
        keyspace: &str,
        column_family: &str,
        keys: &[String],
    ) -> Result<Vec<Row>> {
        let state = self.state.read().await;
        let family = state.family(keyspace, column_family)?;
        let now = Utc::now();
        Ok(keys
            .iter()
            .filter_map(|key| family.live_row(key, now))
            .collect())
    }

    async fn get_count(&self, keyspace: &str, column_family: &str, key: &str) -> Result<usize> {
        let state = self.state.read().await;
        let family = state.family(keyspace, column_family)?;
        Ok(family
            .live_row(key, Utc::now())
            .map(|row| row.columns.len())
            .unwrap_or(0))
    }

    async fn multiget_count(
        &self,
        keyspace: &str,
        column_family: &str,
        keys: &[String],
    ) -> Result<BTreeMap<String, usize>> {
        let state = self.state.read().await;
        let family = state.family(keyspace, column_family)?;
        let now = Utc::now();
        Ok(keys
            .iter()
            .filter_map(|key| {
                family
                    .live_row(key, now)
                    .map(|row| (key.clone(), row.columns.len()))
            })
            .collect())
    }

    async fn get_range(
        &self,
        keyspace: &str,
        column_family: &str,
        range: &KeyRange,
    ) -> Result<Vec<Row>> {
        let state = self.state.read().await;
        let family = state.family(keyspace, column_family)?;
        let now = Utc::now();
        let limit = range.limit.unwrap_or(usize::MAX);

        Ok(family
            .rows
            .keys()
            .filter(|key| range.start.as_deref().is_none_or(|start| key.as_str() >= start))
            .take_while(|key| {
                range
                    .finish
                    .as_deref()
                    .is_none_or(|finish| key.as_str() <= finish)
            })
            .filter_map(|key| family.live_row(key, now))
            .take(limit)
            .collect())
    }

    async fn get_indexed_slices(
        &self,
        keyspace: &str,
        column_family: &str,
        clause: &IndexClause,
    ) -> Result<Vec<Row>> {
        let state = self.state.read().await;
        let family = state.family(keyspace, column_family)?;

        let has_indexed_eq = clause.expressions.iter().any(|expr| {
            expr.op == IndexOperator::Eq && family.indexes.contains_key(&expr.column)
        });
        if !has_indexed_eq {
            return Err(CassError::store(
                "No indexed columns present in index clause with operator EQ",
            ));
        }

        let now = Utc::now();
        Ok(family
            .rows
            .keys()
            .filter(|key| key.as_str() >= clause.start_key.as_str())
            .filter_map(|key| family.live_row(key, now))
            .filter(|row| clause.expressions.iter().all(|e| matches_expression(row, e)))
            .take(clause.count)
            .collect())
    }

    async fn insert(
        &self,
        keyspace: &str,
        column_family: &str,
        row: &Row,
        options: &WriteOptions,
    ) -> Result<()> {
        if row.key.is_empty() {
            return Err(CassError::store("row key cannot be empty"));
        }
        if row.columns.is_empty() {
            return Err(CassError::store("insert needs at least one column"));
        }

        let mut state = self.state.write().await;
        let family = state.family_mut(keyspace, column_family)?;

        if family.def.comparator_type == ColumnType::TimeUuid {
            if let Some(bad) = row
                .columns
                .keys()
                .find(|name| !uuid::Uuid::parse_str(name).is_ok_and(|u| is_time_uuid(&u)))
            {
                return Err(CassError::store(format!(
                    "column name '{}' is not a TimeUUID",
                    bad
                )));
            }
        }
        for (name, value) in &row.columns {
            if let Some(validator) = family.validator_for(name) {
                if !value.conforms_to(validator) {
                    return Err(CassError::store(format!(
                        "value for column '{}' does not validate as {}",
                        name, validator
                    )));
                }
            }
        }

        let timestamp = options.timestamp.unwrap_or_else(micros_now);
        // A zero TTL never expires.
        let expires_at = options
            .ttl
            .filter(|ttl| *ttl > 0)
            .map(|ttl| Utc::now() + Duration::seconds(i64::from(ttl)));

        let cells = family.rows.entry(row.key.clone()).or_default();
        for (name, value) in &row.columns {
            let newer = cells
                .get(name)
                .is_none_or(|existing| existing.timestamp <= timestamp);
            if newer {
                cells.insert(
                    name.clone(),
                    Cell {
                        value: value.clone(),
                        timestamp,
                        expires_at,
                    },
                );
            }
        }
        Ok(())
    }
}

#[async_trait]
impl SchemaConnector for MemoryCluster {
    async fn connect(&self, server: &str) -> Result<Box<dyn SchemaManager>> {
        tracing::debug!("Opening schema session on {}", server);
        self.open_sessions.fetch_add(1, AtomicOrdering::SeqCst);
        Ok(Box::new(MemorySchemaManager {
            cluster: self.clone(),
            closed: Arc::new(std::sync::atomic::AtomicBool::new(false)),
        }))
    }
}

pub struct MemorySchemaManager {
    cluster: MemoryCluster,
    closed: Arc<std::sync::atomic::AtomicBool>,
}

impl MemorySchemaManager {
    fn ensure_open(&self) -> Result<()> {
        if self.closed.load(AtomicOrdering::SeqCst) {
            return Err(CassError::store("schema session is closed"));
        }
        Ok(())
    }
}

#[async_trait]
impl SchemaManager for MemorySchemaManager {
    async fn column_families(&self, keyspace: &str) -> Result<Vec<String>> {
        self.ensure_open()?;
        let state = self.cluster.state.read().await;
        Ok(state.keyspace(keyspace)?.keys().cloned().collect())
    }

    async fn create_column_family(&self, keyspace: &str, def: &ColumnFamilyDef) -> Result<()> {
        self.ensure_open()?;
        let mut state = self.cluster.state.write().await;
        let families = state.keyspace_mut(keyspace)?;
        if families.contains_key(&def.name) {
            return Err(CassError::store(format!(
                "column family '{}' already exists in '{}'",
                def.name, keyspace
            )));
        }
        families.insert(
            def.name.clone(),
            Family {
                def: def.clone(),
                indexes: BTreeMap::new(),
                rows: BTreeMap::new(),
            },
        );
        Ok(())
    }

    async fn drop_column_family(&self, keyspace: &str, column_family: &str) -> Result<()> {
        self.ensure_open()?;
        let mut state = self.cluster.state.write().await;
        let families = state.keyspace_mut(keyspace)?;
        families
            .remove(column_family)
            .map(|_| ())
            .ok_or_else(|| CassError::ColumnFamilyNotFound {
                keyspace: keyspace.to_string(),
                column_family: column_family.to_string(),
            })
    }

    async fn create_index(
        &self,
        keyspace: &str,
        column_family: &str,
        column: &str,
        value_type: &ColumnType,
        index_name: &str,
    ) -> Result<()> {
        self.ensure_open()?;
        let mut state = self.cluster.state.write().await;

        let index_names: BTreeSet<String> = state
            .keyspace(keyspace)?
            .values()
            .flat_map(|family| family.indexes.values().cloned())
            .collect();
        if index_names.contains(index_name) {
            return Err(CassError::store(format!(
                "index '{}' already exists",
                index_name
            )));
        }

        let family = state.family_mut(keyspace, column_family)?;
        family
            .def
            .column_validation_classes
            .insert(column.to_string(), value_type.clone());
        family
            .indexes
            .insert(column.to_string(), index_name.to_string());
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        if !self.closed.swap(true, AtomicOrdering::SeqCst) {
            self.cluster.open_sessions.fetch_sub(1, AtomicOrdering::SeqCst);
        }
        Ok(())
    }
}
