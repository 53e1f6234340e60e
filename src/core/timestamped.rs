use crate::core::registry::Declaration;
use crate::domain::model::{ModelDef, Row, WriteOptions};
use crate::domain::ports::ColumnFamilyStore;
use crate::domain::types::{compare_time_uuids, is_time_uuid, Value};
use crate::utils::error::{CassError, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

/// The timeline of one object per row.
///
/// Every column is a version of the object: the column name is a version 1
/// time UUID and the value the object serialized as JSON. Versions are
/// ordered by the UUID's timestamp and the newest is the current state.
pub struct TimestampedModel<S: ColumnFamilyStore> {
    declaration: Declaration,
    store: Arc<S>,
}

impl<S: ColumnFamilyStore> TimestampedModel<S> {
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

    /// Appends a new version and returns its key.
    pub async fn push<T: Serialize>(&self, rowkey: &str, object: &T) -> Result<Uuid> {
        let version = Uuid::now_v1(&node_id());
        self.push_at(rowkey, version, object).await?;
        Ok(version)
    }

    /// Appends a version under an explicit time UUID.
    pub async fn push_at<T: Serialize>(&self, rowkey: &str, version: Uuid, object: &T) -> Result<()> {
        if !is_time_uuid(&version) {
            return Err(CassError::model(format!(
                "version {} of {}[{}] is not a time UUID",
                version,
                self.column_family(),
                rowkey
            )));
        }
        let payload = serde_json::to_vec(object)?;
        let row = Row::new(rowkey).with(version.to_string(), Value::Bytes(payload));
        tracing::debug!("New version {} of {}[{}]", version, self.column_family(), rowkey);
        self.store
            .insert(self.keyspace(), self.column_family(), &row, &WriteOptions::default())
            .await
    }

    /// The last state of the object stored at `rowkey`.
    pub async fn get_one_by_rowkey<T: DeserializeOwned>(&self, rowkey: &str) -> Result<Option<T>> {
        Ok(self
            .history(rowkey)
            .await?
            .pop()
            .map(|(_, object)| object))
    }

    /// Every version of the object, oldest first.
    pub async fn history<T: DeserializeOwned>(&self, rowkey: &str) -> Result<Vec<(Uuid, T)>> {
        let Some(row) = self
            .store
            .get(self.keyspace(), self.column_family(), rowkey, None)
            .await?
        else {
            return Ok(Vec::new());
        };

        let mut versions = row
            .columns
            .iter()
            .map(|(name, value)| decode_version(name, value))
            .collect::<Result<Vec<(Uuid, T)>>>()?;
        versions.sort_by(|(left, _), (right, _)| compare_time_uuids(left, right));
        Ok(versions)
    }

    pub async fn version_count(&self, rowkey: &str) -> Result<usize> {
        self.store
            .get_count(self.keyspace(), self.column_family(), rowkey)
            .await
    }
}

/// Node id for generated versions: the process id with the multicast bit
/// set, marking it as not a hardware address.
fn node_id() -> [u8; 6] {
    let pid = std::process::id().to_be_bytes();
    [0x01, 0x00, pid[0], pid[1], pid[2], pid[3]]
}

fn decode_version<T: DeserializeOwned>(name: &str, value: &Value) -> Result<(Uuid, T)> {
    let version = Uuid::parse_str(name)
        .map_err(|e| CassError::store(format!("invalid version key '{}': {}", name, e)))?;
    let payload = value
        .as_bytes()
        .ok_or_else(|| CassError::store(format!("version {} is not stored as bytes", name)))?;
    Ok((version, serde_json::from_slice(payload)?))
}
