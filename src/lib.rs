pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use adapters::{cql::CqlScript, memory::MemoryCluster, process::ProcessRunner};
pub use config::schema_config::SchemaConfig;
pub use core::builder::{BuildReport, Builder};
pub use core::model::Model;
pub use core::packaging::{Packager, PackagingConfig, Target, Tool};
pub use core::registry::{ConnectionPool, Declaration, PoolRegistry};
pub use core::timestamped::TimestampedModel;
pub use domain::model::{Column, ModelDef, ModelKind, Row, WriteOptions};
pub use domain::types::{ColumnType, Value};
pub use utils::error::{CassError, Result};
