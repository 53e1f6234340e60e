pub mod builder;
pub mod model;
pub mod packaging;
pub mod registry;
pub mod timestamped;

pub use crate::domain::model::{Column, ModelDef, ModelKind, Row, WriteOptions};
pub use crate::domain::ports::{
    ColumnFamilyStore, CommandRunner, CommandSpec, SchemaConnector, SchemaManager,
};
pub use crate::domain::types::{ColumnType, Value};
pub use crate::utils::error::Result;
