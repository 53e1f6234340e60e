use crate::domain::model::{Row, WriteOptions};
use crate::domain::types::{ColumnType, Value};
use crate::utils::error::Result;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

pub const DEFAULT_INDEX_CLAUSE_COUNT: usize = 100;

/// Column family metadata handed to a [`SchemaManager`].
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnFamilyDef {
    pub name: String,
    pub comparator_type: ColumnType,
    pub default_validation_class: Option<ColumnType>,
    pub column_validation_classes: BTreeMap<String, ColumnType>,
    /// Stored name of the column that mirrors the row key, if any.
    pub key_alias: Option<String>,
    pub comment: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexOperator {
    Eq,
    Gt,
    Gte,
    Lt,
    Lte,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndexExpression {
    pub column: String,
    pub op: IndexOperator,
    pub value: Value,
}

impl IndexExpression {
    pub fn equal(column: impl Into<String>, value: Value) -> Self {
        Self {
            column: column.into(),
            op: IndexOperator::Eq,
            value,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndexClause {
    pub expressions: Vec<IndexExpression>,
    pub start_key: String,
    pub count: usize,
}

impl IndexClause {
    pub fn new(expressions: Vec<IndexExpression>) -> Self {
        Self {
            expressions,
            start_key: String::new(),
            count: DEFAULT_INDEX_CLAUSE_COUNT,
        }
    }
}

/// Row key bounds for range scans. Both ends are inclusive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyRange {
    pub start: Option<String>,
    pub finish: Option<String>,
    pub limit: Option<usize>,
}

/// Data access to column families.
#[async_trait]
pub trait ColumnFamilyStore: Send + Sync {
    async fn get(
        &self,
        keyspace: &str,
        column_family: &str,
        key: &str,
        columns: Option<&[String]>,
    ) -> Result<Option<Row>>;

    /// Returns the rows that exist, in the order of `keys`.
    async fn multiget(&self, keyspace: &str, column_family: &str, keys: &[String])
        -> Result<Vec<Row>>;

    async fn get_count(&self, keyspace: &str, column_family: &str, key: &str) -> Result<usize>;

    async fn multiget_count(
        &self,
        keyspace: &str,
        column_family: &str,
        keys: &[String],
    ) -> Result<BTreeMap<String, usize>>;

    async fn get_range(
        &self,
        keyspace: &str,
        column_family: &str,
        range: &KeyRange,
    ) -> Result<Vec<Row>>;

    async fn get_indexed_slices(
        &self,
        keyspace: &str,
        column_family: &str,
        clause: &IndexClause,
    ) -> Result<Vec<Row>>;

    async fn insert(
        &self,
        keyspace: &str,
        column_family: &str,
        row: &Row,
        options: &WriteOptions,
    ) -> Result<()>;
}

/// Schema changes within a keyspace.
#[async_trait]
pub trait SchemaManager: Send + Sync {
    async fn column_families(&self, keyspace: &str) -> Result<Vec<String>>;

    async fn create_column_family(&self, keyspace: &str, def: &ColumnFamilyDef) -> Result<()>;

    async fn drop_column_family(&self, keyspace: &str, column_family: &str) -> Result<()>;

    async fn create_index(
        &self,
        keyspace: &str,
        column_family: &str,
        column: &str,
        value_type: &ColumnType,
        index_name: &str,
    ) -> Result<()>;

    async fn close(&self) -> Result<()>;
}

/// Opens a [`SchemaManager`] against one server.
#[async_trait]
pub trait SchemaConnector: Send + Sync {
    async fn connect(&self, server: &str) -> Result<Box<dyn SchemaManager>>;
}

/// An external program invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
}

impl CommandSpec {
    pub fn new<I, A>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
            cwd: None,
        }
    }

    pub fn in_dir(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            if arg.contains(char::is_whitespace) {
                write!(f, " '{}'", arg)?;
            } else {
                write!(f, " {}", arg)?;
            }
        }
        Ok(())
    }
}

#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, command: &CommandSpec) -> Result<()>;
}
