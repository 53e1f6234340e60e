use thiserror::Error;

#[derive(Error, Debug)]
pub enum CassError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Invalid configuration value for '{field}': {value} ({reason})")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing configuration field: {field}")]
    MissingConfigError { field: String },

    #[error("Configuration validation failed for '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Model error: {message}")]
    ModelError { message: String },

    #[error("Builder error: {message}")]
    BuilderError { message: String },

    #[error("Column family '{column_family}' not found in keyspace '{keyspace}'")]
    ColumnFamilyNotFound {
        keyspace: String,
        column_family: String,
    },

    #[error("Row '{key}' already exists in '{column_family}'")]
    RowExists { column_family: String, key: String },

    #[error("Expected at most one row for {attribute} = {value}, found {count}")]
    MultipleRowsFound {
        attribute: String,
        value: String,
        count: usize,
    },

    #[error("Store error: {message}")]
    StoreError { message: String },

    #[error("Command '{program}' failed with {status}")]
    CommandFailed { program: String, status: String },
}

pub type Result<T> = std::result::Result<T, CassError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Model,
    Schema,
    Storage,
    External,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl CassError {
    pub fn model(message: impl Into<String>) -> Self {
        Self::ModelError {
            message: message.into(),
        }
    }

    pub fn builder(message: impl Into<String>) -> Self {
        Self::BuilderError {
            message: message.into(),
        }
    }

    pub fn store(message: impl Into<String>) -> Self {
        Self::StoreError {
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::ConfigError { .. }
            | Self::InvalidConfigValueError { .. }
            | Self::MissingConfigError { .. }
            | Self::ConfigValidationError { .. } => ErrorCategory::Configuration,
            Self::ModelError { .. } | Self::SerializationError(_) => ErrorCategory::Model,
            Self::BuilderError { .. } => ErrorCategory::Schema,
            Self::ColumnFamilyNotFound { .. }
            | Self::RowExists { .. }
            | Self::MultipleRowsFound { .. }
            | Self::StoreError { .. } => ErrorCategory::Storage,
            Self::CommandFailed { .. } => ErrorCategory::External,
            Self::IoError(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Configuration | ErrorCategory::Model | ErrorCategory::Schema => {
                ErrorSeverity::High
            }
            ErrorCategory::Storage => match self {
                Self::RowExists { .. } | Self::MultipleRowsFound { .. } => ErrorSeverity::Medium,
                _ => ErrorSeverity::High,
            },
            ErrorCategory::External => ErrorSeverity::High,
            ErrorCategory::System => ErrorSeverity::Critical,
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Configuration => format!("Invalid configuration: {}", self),
            ErrorCategory::Model => format!("Model declaration problem: {}", self),
            ErrorCategory::Schema => format!("Could not build the schema: {}", self),
            ErrorCategory::Storage => format!("Storage operation failed: {}", self),
            ErrorCategory::External => format!("External tool failed: {}", self),
            ErrorCategory::System => format!("System error: {}", self),
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            Self::MissingConfigError { .. } => "Add the missing field to the schema file",
            Self::InvalidConfigValueError { .. } | Self::ConfigValidationError { .. } => {
                "Check the value against the documented format"
            }
            Self::ConfigError { .. } => "Check the configuration file syntax",
            Self::ModelError { .. } => "Check column names, aliases and declared indexes",
            Self::BuilderError { .. } => "Declare exactly one primary key per model",
            Self::ColumnFamilyNotFound { .. } => "Run the schema builder before using the model",
            Self::RowExists { .. } => "Use a new row key or remove the existing row first",
            Self::MultipleRowsFound { .. } => "Use get_by to fetch every matching row",
            Self::CommandFailed { .. } => "Inspect the tool output above and rerun the target",
            Self::SerializationError(_) => "Check that stored versions match the object type",
            Self::StoreError { .. } => "Check the store connection and keyspace",
            Self::IoError(_) => "Check file permissions and available disk space",
        }
    }

    /// Process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self.severity() {
            ErrorSeverity::Low => 0,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categories_and_exit_codes() {
        let err = CassError::builder("no primary key");
        assert_eq!(err.category(), ErrorCategory::Schema);
        assert_eq!(err.exit_code(), 1);

        let err = CassError::RowExists {
            column_family: "user".to_string(),
            key: "alice".to_string(),
        };
        assert_eq!(err.severity(), ErrorSeverity::Medium);
        assert_eq!(err.exit_code(), 2);

        let err = CassError::IoError(std::io::Error::other("disk"));
        assert_eq!(err.severity(), ErrorSeverity::Critical);
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn test_user_friendly_message_includes_details() {
        let err = CassError::MissingConfigError {
            field: "keyspace".to_string(),
        };
        assert!(err.user_friendly_message().contains("keyspace"));
    }
}
