use crate::core::model::Model;
use crate::core::timestamped::TimestampedModel;
use crate::domain::model::{ModelDef, ModelKind};
use crate::domain::ports::ColumnFamilyStore;
use crate::utils::error::{CassError, Result};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

pub const DEFAULT_KEYSPACE: &str = "Keyspace";
pub const DEFAULT_HOSTS: &[&str] = &["localhost:9160"];

/// The servers serving one keyspace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionPool {
    pub keyspace: String,
    pub server_list: Vec<String>,
}

impl ConnectionPool {
    pub fn new(keyspace: impl Into<String>, server_list: Vec<String>) -> Self {
        Self {
            keyspace: keyspace.into(),
            server_list,
        }
    }

    pub fn first_server(&self) -> Result<&str> {
        self.server_list
            .first()
            .map(String::as_str)
            .ok_or_else(|| CassError::ConfigError {
                message: format!("pool for keyspace '{}' has no servers", self.keyspace),
            })
    }
}

/// A model definition bound to the pool of its keyspace.
#[derive(Debug, Clone)]
pub struct Declaration {
    pub def: ModelDef,
    pub pool: Arc<ConnectionPool>,
}

/// One pool per keyspace, created on first use.
#[derive(Debug, Default)]
pub struct PoolRegistry {
    pools: Mutex<HashMap<String, Arc<ConnectionPool>>>,
}

impl PoolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the pool registered for `keyspace`, creating it from `hosts`
    /// when missing. Hosts passed for an already registered keyspace are
    /// ignored.
    pub fn pool(&self, keyspace: &str, hosts: &[String]) -> Result<Arc<ConnectionPool>> {
        let mut pools = self
            .pools
            .lock()
            .map_err(|_| CassError::store("pool registry lock poisoned"))?;

        if let Some(pool) = pools.get(keyspace) {
            if pool.server_list != hosts {
                tracing::debug!(
                    "Keyspace {} already has a pool on {:?}, ignoring {:?}",
                    keyspace,
                    pool.server_list,
                    hosts
                );
            }
            return Ok(Arc::clone(pool));
        }

        let hosts = if hosts.is_empty() {
            DEFAULT_HOSTS.iter().map(|h| h.to_string()).collect()
        } else {
            hosts.to_vec()
        };
        let pool = Arc::new(ConnectionPool::new(keyspace, hosts));
        tracing::debug!("Registered pool for keyspace {} on {:?}", keyspace, pool.server_list);
        pools.insert(keyspace.to_string(), Arc::clone(&pool));
        Ok(pool)
    }

    pub fn default_pool(&self) -> Result<Arc<ConnectionPool>> {
        self.pool(DEFAULT_KEYSPACE, &[])
    }

    pub fn declare(&self, def: ModelDef, keyspace: &str, hosts: &[String]) -> Result<Declaration> {
        let pool = self.pool(keyspace, hosts)?;
        Ok(Declaration { def, pool })
    }

    /// Binds a standard model to its keyspace pool and a store.
    pub fn declare_model<S: ColumnFamilyStore>(
        &self,
        def: ModelDef,
        keyspace: &str,
        hosts: &[String],
        store: Arc<S>,
    ) -> Result<Model<S>> {
        if def.kind() != ModelKind::Standard {
            return Err(CassError::model(format!(
                "{} is a timestamped model; use declare_timestamped_model",
                def.name()
            )));
        }
        Ok(Model::new(self.declare(def, keyspace, hosts)?, store))
    }

    pub fn declare_timestamped_model<S: ColumnFamilyStore>(
        &self,
        def: ModelDef,
        keyspace: &str,
        hosts: &[String],
        store: Arc<S>,
    ) -> Result<TimestampedModel<S>> {
        if def.kind() != ModelKind::Timestamped {
            return Err(CassError::model(format!(
                "{} is a standard model; use declare_model",
                def.name()
            )));
        }
        Ok(TimestampedModel::new(self.declare(def, keyspace, hosts)?, store))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_is_created_once_per_keyspace() {
        let registry = PoolRegistry::new();
        let first = registry
            .pool("app", &["db1:9160".to_string()])
            .unwrap();
        let second = registry
            .pool("app", &["db2:9160".to_string()])
            .unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(second.server_list, vec!["db1:9160"]);
    }

    #[test]
    fn test_default_pool() {
        let registry = PoolRegistry::new();
        let pool = registry.default_pool().unwrap();
        assert_eq!(pool.keyspace, DEFAULT_KEYSPACE);
        assert_eq!(pool.first_server().unwrap(), "localhost:9160");
    }

    #[test]
    fn test_first_server_of_empty_pool() {
        let pool = ConnectionPool::new("ks", Vec::new());
        assert!(pool.first_server().is_err());
    }
}
