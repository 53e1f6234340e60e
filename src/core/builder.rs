//! Creates column families and secondary indexes from model declarations.
//!
//! Keyspaces are not created here. A column family that already exists is
//! left alone unless `force` is set, in which case it is dropped and
//! recreated.

use crate::core::registry::Declaration;
use crate::domain::model::{ModelDef, ModelKind};
use crate::domain::ports::{ColumnFamilyDef, SchemaConnector, SchemaManager};
use crate::domain::types::ColumnType;
use crate::utils::error::{CassError, Result};

pub const GENERATED_COMMENT: &str = "Generated by cassobjects";

/// What a [`Builder::create`] run did, per column family.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildReport {
    pub created: Vec<String>,
    pub skipped: Vec<String>,
    pub dropped: Vec<String>,
    pub indexes: Vec<String>,
}

pub struct Builder;

impl Builder {
    pub async fn create<'a, C, I>(connector: &C, declarations: I, force: bool) -> Result<BuildReport>
    where
        C: SchemaConnector + ?Sized,
        I: IntoIterator<Item = &'a Declaration>,
    {
        let mut report = BuildReport::default();
        for declaration in declarations {
            Self::create_one(connector, declaration, force, &mut report).await?;
        }
        Ok(report)
    }

    async fn create_one<C>(
        connector: &C,
        declaration: &Declaration,
        force: bool,
        report: &mut BuildReport,
    ) -> Result<()>
    where
        C: SchemaConnector + ?Sized,
    {
        let server = declaration.pool.first_server()?;
        let manager = connector.connect(server).await?;

        let result = apply(manager.as_ref(), declaration, force, report).await;
        let closed = manager.close().await;
        result.and(closed)
    }
}

/// Existing column families are skipped before the model layout is checked.
async fn apply(
    manager: &dyn SchemaManager,
    declaration: &Declaration,
    force: bool,
    report: &mut BuildReport,
) -> Result<()> {
    let keyspace = &declaration.pool.keyspace;
    let name = declaration.def.column_family();
    let exists = manager
        .column_families(keyspace)
        .await?
        .iter()
        .any(|cf| cf == name);

    if exists && !force {
        tracing::info!("Column family {}.{} exists, skipping", keyspace, name);
        report.skipped.push(name.to_string());
        return Ok(());
    }

    let family = match declaration.def.kind() {
        ModelKind::Standard => standard_family(&declaration.def)?,
        ModelKind::Timestamped => timestamped_family(&declaration.def),
    };

    if exists {
        tracing::warn!("Dropping column family {}.{}", keyspace, name);
        manager.drop_column_family(keyspace, name).await?;
        report.dropped.push(name.to_string());
    }

    manager.create_column_family(keyspace, &family).await?;
    tracing::info!("Created column family {}.{}", keyspace, family.name);
    report.created.push(family.name.clone());

    if declaration.def.kind() == ModelKind::Timestamped {
        return Ok(());
    }
    for (attr, column) in declaration.def.indexed_columns() {
        let stored = column.stored_name(attr);
        let index_name = format!("{}_{}_index", family.name, stored);
        manager
            .create_index(keyspace, &family.name, stored, &column.col_type, &index_name)
            .await?;
        tracing::info!("Created index {}", index_name);
        report.indexes.push(index_name);
    }
    Ok(())
}

/// Column family for a standard model: exactly one primary key, one
/// validation class per declared column.
pub fn standard_family(def: &ModelDef) -> Result<ColumnFamilyDef> {
    let primary_keys = def.primary_keys();
    let primary = match primary_keys.as_slice() {
        [] => {
            return Err(CassError::builder(format!("{}: No primary key", def.name())));
        }
        [(attr, column)] => column.stored_name(attr).to_string(),
        _ => {
            return Err(CassError::builder(format!(
                "{}: Only one key can be used as primary",
                def.name()
            )));
        }
    };

    Ok(ColumnFamilyDef {
        name: def.column_family().to_string(),
        comparator_type: ColumnType::Utf8,
        default_validation_class: None,
        column_validation_classes: def.validation_classes(),
        key_alias: Some(primary),
        comment: GENERATED_COMMENT.to_string(),
    })
}

/// Column family for a timestamped model: TimeUUID column names, opaque
/// serialized values.
pub fn timestamped_family(def: &ModelDef) -> ColumnFamilyDef {
    ColumnFamilyDef {
        name: def.column_family().to_string(),
        comparator_type: ColumnType::TimeUuid,
        default_validation_class: Some(ColumnType::Bytes),
        column_validation_classes: Default::default(),
        key_alias: None,
        comment: GENERATED_COMMENT.to_string(),
    }
}
