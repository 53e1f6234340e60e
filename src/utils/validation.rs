use crate::utils::error::{CassError, Result};
use std::collections::HashSet;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

pub fn validate_non_empty_string(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(CassError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: "Value cannot be empty or whitespace-only".to_string(),
        });
    }
    Ok(())
}

/// Checks a `host:port` server address such as `localhost:9160`.
pub fn validate_server_address(field_name: &str, address: &str) -> Result<()> {
    let invalid = |reason: &str| CassError::InvalidConfigValueError {
        field: field_name.to_string(),
        value: address.to_string(),
        reason: reason.to_string(),
    };

    let (host, port) = address
        .rsplit_once(':')
        .ok_or_else(|| invalid("Expected host:port"))?;

    if host.is_empty() || host.chars().any(char::is_whitespace) {
        return Err(invalid("Host cannot be empty or contain whitespace"));
    }

    match port.parse::<u16>() {
        Ok(0) | Err(_) => Err(invalid("Port must be a number between 1 and 65535")),
        Ok(_) => Ok(()),
    }
}

/// Keyspace and column family names: ASCII letters, digits and underscores.
pub fn validate_identifier(field_name: &str, value: &str) -> Result<()> {
    validate_non_empty_string(field_name, value)?;

    let starts_ok = value
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic());
    if !starts_ok || !value.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(CassError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: "Must start with a letter and contain only letters, digits and '_'"
                .to_string(),
        });
    }
    Ok(())
}

pub fn validate_unique<'a, I>(field_name: &str, values: I) -> Result<()>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut seen = HashSet::new();
    for value in values {
        if !seen.insert(value) {
            return Err(CassError::InvalidConfigValueError {
                field: field_name.to_string(),
                value: value.to_string(),
                reason: "Duplicate value".to_string(),
            });
        }
    }
    Ok(())
}

pub fn validate_required_field<'a, T>(field_name: &str, value: &'a Option<T>) -> Result<&'a T> {
    value.as_ref().ok_or_else(|| CassError::MissingConfigError {
        field: field_name.to_string(),
    })
}
