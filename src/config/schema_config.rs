use crate::core::registry::{Declaration, PoolRegistry, DEFAULT_HOSTS, DEFAULT_KEYSPACE};
use crate::domain::model::{Column, ModelDef, ModelKind};
use crate::domain::types::ColumnType;
use crate::utils::error::{CassError, Result};
use crate::utils::validation::{
    validate_identifier, validate_non_empty_string, validate_server_address, validate_unique,
    Validate,
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Models to build, as read from a TOML schema file.
///
/// ```toml
/// keyspace = "Keyspace"
/// hosts = ["localhost:9160"]
///
/// [[models]]
/// name = "User"
/// indexes = ["email"]
///
/// [models.columns.username]
/// type = "UTF8Type"
/// primary_key = true
///
/// [models.columns.email]
/// type = "utf8"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaConfig {
    pub keyspace: Option<String>,
    pub hosts: Option<Vec<String>>,
    #[serde(default)]
    pub models: Vec<ModelConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    pub name: String,
    pub column_family: Option<String>,
    pub kind: Option<ModelKind>,
    pub indexes: Option<Vec<String>>,
    #[serde(default)]
    pub columns: BTreeMap<String, ColumnConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnConfig {
    #[serde(rename = "type")]
    pub col_type: ColumnType,
    pub alias: Option<String>,
    pub index: Option<bool>,
    pub primary_key: Option<bool>,
}

impl ColumnConfig {
    fn to_column(&self) -> Column {
        let mut column = match &self.alias {
            Some(alias) => Column::aliased(alias.clone(), self.col_type.clone()),
            None => Column::new(self.col_type.clone()),
        };
        if self.index.unwrap_or(false) {
            column = column.index();
        }
        if self.primary_key.unwrap_or(false) {
            column = column.primary_key();
        }
        column
    }
}

impl ModelConfig {
    pub fn to_model_def(&self) -> Result<ModelDef> {
        let mut builder = ModelDef::builder(&self.name).kind(self.kind.unwrap_or_default());
        if let Some(cf) = &self.column_family {
            builder = builder.column_family(cf);
        }
        for (attr, column) in &self.columns {
            builder = builder.column(attr, column.to_column());
        }
        for attr in self.indexes.iter().flatten() {
            builder = builder.declare_index(attr);
        }
        builder.build()
    }
}

impl SchemaConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(CassError::IoError)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| CassError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// Replaces `${VAR}` with the value of the environment variable. Unset
    /// variables are left as written.
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| CassError::ConfigError {
            message: e.to_string(),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn keyspace(&self) -> &str {
        self.keyspace.as_deref().unwrap_or(DEFAULT_KEYSPACE)
    }

    pub fn hosts(&self) -> Vec<String> {
        match &self.hosts {
            Some(hosts) if !hosts.is_empty() => hosts.clone(),
            _ => DEFAULT_HOSTS.iter().map(|h| h.to_string()).collect(),
        }
    }

    pub fn model_defs(&self) -> Result<Vec<ModelDef>> {
        self.models.iter().map(ModelConfig::to_model_def).collect()
    }

    /// Declares every model in the configured keyspace.
    pub fn declarations(&self, registry: &PoolRegistry) -> Result<Vec<Declaration>> {
        let hosts = self.hosts();
        self.model_defs()?
            .into_iter()
            .map(|def| registry.declare(def, self.keyspace(), &hosts))
            .collect()
    }

    pub fn validate_config(&self) -> Result<()> {
        validate_identifier("keyspace", self.keyspace())?;

        for host in self.hosts() {
            validate_server_address("hosts", &host)?;
        }

        if self.models.is_empty() {
            return Err(CassError::MissingConfigError {
                field: "models".to_string(),
            });
        }
        validate_unique("models.name", self.models.iter().map(|m| m.name.as_str()))?;

        for model in &self.models {
            validate_non_empty_string("models.name", &model.name)?;
            if let Some(cf) = &model.column_family {
                validate_identifier("models.column_family", cf)?;
            }
            for attr in model.columns.keys() {
                validate_non_empty_string("models.columns", attr)?;
            }
        }

        // Column families must not collide once defaults are applied.
        let defs = self.model_defs()?;
        validate_unique("models.column_family", defs.iter().map(|d| d.column_family()))?;
        Ok(())
    }
}

impl Validate for SchemaConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const BLOG: &str = r#"
keyspace = "Blog"
hosts = ["db1:9160", "db2:9160"]

[[models]]
name = "User"
indexes = ["email"]

[models.columns.username]
type = "UTF8Type"
primary_key = true

[models.columns.email]
type = "utf8"

[models.columns.age]
type = "LongType"
alias = "user_age"

[[models]]
name = "Revision"
kind = "timestamped"
column_family = "revisions"
"#;

    #[test]
    fn test_parse_schema_config() {
        let config = SchemaConfig::from_toml_str(BLOG).unwrap();
        assert_eq!(config.keyspace(), "Blog");
        assert_eq!(config.hosts(), vec!["db1:9160", "db2:9160"]);
        config.validate().unwrap();

        let defs = config.model_defs().unwrap();
        assert_eq!(defs.len(), 2);
        assert_eq!(defs[0].column_family(), "user");
        assert!(defs[0].column("email").unwrap().index);
        assert_eq!(defs[0].column("age").unwrap().alias.as_deref(), Some("user_age"));
        assert_eq!(defs[1].kind(), ModelKind::Timestamped);
        assert_eq!(defs[1].column_family(), "revisions");
    }

    #[test]
    fn test_defaults() {
        let config = SchemaConfig::from_toml_str(
            r#"
[[models]]
name = "Tag"
[models.columns.name]
type = "utf8"
primary_key = true
"#,
        )
        .unwrap();
        assert_eq!(config.keyspace(), DEFAULT_KEYSPACE);
        assert_eq!(config.hosts(), vec!["localhost:9160"]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("CASSOBJECTS_TEST_KEYSPACE", "FromEnv");
        let config = SchemaConfig::from_toml_str(
            r#"
keyspace = "${CASSOBJECTS_TEST_KEYSPACE}"
[[models]]
name = "Tag"
"#,
        )
        .unwrap();
        assert_eq!(config.keyspace(), "FromEnv");
        std::env::remove_var("CASSOBJECTS_TEST_KEYSPACE");
    }

    #[test]
    fn test_unknown_type_is_a_parse_error() {
        let result = SchemaConfig::from_toml_str(
            r#"
[[models]]
name = "Tag"
[models.columns.name]
type = "VarcharType"
"#,
        );
        assert!(matches!(result, Err(CassError::ConfigValidationError { .. })));
    }

    #[test]
    fn test_timestamped_model_with_index_rejected() {
        let config = SchemaConfig::from_toml_str(
            r#"
[[models]]
name = "Doc"
kind = "timestamped"

[models.columns.owner]
type = "UTF8Type"
index = true
"#,
        )
        .unwrap();
        let err = config.model_defs().unwrap_err();
        assert!(matches!(err, CassError::ModelError { .. }));
    }

    #[test]
    fn test_validation_errors() {
        let bad_host = SchemaConfig::from_toml_str(
            r#"
hosts = ["localhost"]
[[models]]
name = "Tag"
"#,
        )
        .unwrap();
        assert!(bad_host.validate().is_err());

        let no_models = SchemaConfig::from_toml_str(r#"keyspace = "ks""#).unwrap();
        assert!(matches!(
            no_models.validate(),
            Err(CassError::MissingConfigError { .. })
        ));

        let clash = SchemaConfig::from_toml_str(
            r#"
[[models]]
name = "Tag"
[[models]]
name = "Other"
column_family = "tag"
"#,
        )
        .unwrap();
        assert!(clash.validate().is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(BLOG.as_bytes()).unwrap();
        let config = SchemaConfig::from_file(file.path()).unwrap();
        assert_eq!(config.models.len(), 2);

        let registry = PoolRegistry::new();
        let declarations = config.declarations(&registry).unwrap();
        assert_eq!(declarations[0].pool.keyspace, "Blog");
        assert!(std::sync::Arc::ptr_eq(
            &declarations[0].pool,
            &declarations[1].pool
        ));
    }
}
