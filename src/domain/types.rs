//! Column types understood by the store and the values they validate.

use crate::utils::error::{CassError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ColumnType {
    Ascii,
    Boolean,
    Bytes,
    Composite(Vec<ColumnType>),
    CounterColumn,
    Date,
    Double,
    Float,
    Integer,
    LexicalUuid,
    Long,
    TimeUuid,
    Utf8,
}

impl ColumnType {
    /// Validation class name as used in column family metadata.
    pub fn validation_class(&self) -> String {
        match self {
            Self::Composite(parts) => {
                let inner: Vec<String> = parts.iter().map(|p| p.validation_class()).collect();
                format!("CompositeType({})", inner.join(","))
            }
            other => other.simple_class().to_string(),
        }
    }

    fn simple_class(&self) -> &'static str {
        match self {
            Self::Ascii => "AsciiType",
            Self::Boolean => "BooleanType",
            Self::Bytes => "BytesType",
            Self::Composite(_) => "CompositeType",
            Self::CounterColumn => "CounterColumnType",
            Self::Date => "DateType",
            Self::Double => "DoubleType",
            Self::Float => "FloatType",
            Self::Integer => "IntegerType",
            Self::LexicalUuid => "LexicalUUIDType",
            Self::Long => "LongType",
            Self::TimeUuid => "TimeUUIDType",
            Self::Utf8 => "UTF8Type",
        }
    }

    pub fn cql_type(&self) -> String {
        match self {
            Self::Ascii => "ascii".to_string(),
            Self::Boolean => "boolean".to_string(),
            Self::Bytes => "blob".to_string(),
            Self::Composite(parts) => {
                let inner: Vec<String> = parts.iter().map(|p| p.cql_type()).collect();
                format!("frozen<tuple<{}>>", inner.join(", "))
            }
            Self::CounterColumn => "counter".to_string(),
            Self::Date => "timestamp".to_string(),
            Self::Double => "double".to_string(),
            Self::Float => "float".to_string(),
            Self::Integer => "varint".to_string(),
            Self::LexicalUuid => "uuid".to_string(),
            Self::Long => "bigint".to_string(),
            Self::TimeUuid => "timeuuid".to_string(),
            Self::Utf8 => "text".to_string(),
        }
    }

    /// Accepts validation class names (`UTF8Type`) as well as short names
    /// (`utf8`, `long`, `timeuuid`), case-insensitively.
    pub fn parse(name: &str) -> Result<Self> {
        let name = name.trim();
        let lower = name.to_ascii_lowercase();

        let composite_body = lower
            .strip_prefix("compositetype(")
            .or_else(|| lower.strip_prefix("composite("))
            .and_then(|rest| rest.strip_suffix(')'));
        if let Some(body) = composite_body {
            // Work on the original casing; offsets are identical for ASCII.
            let start = name.len() - body.len() - 1;
            let parts = split_top_level(&name[start..name.len() - 1])
                .into_iter()
                .map(Self::parse)
                .collect::<Result<Vec<_>>>()?;
            if parts.is_empty() {
                return Err(CassError::model("composite type needs at least one component"));
            }
            return Ok(Self::Composite(parts));
        }

        let parsed = match lower.trim_end_matches("type") {
            "ascii" => Self::Ascii,
            "boolean" | "bool" => Self::Boolean,
            "bytes" | "blob" => Self::Bytes,
            "countercolumn" | "counter" => Self::CounterColumn,
            "date" | "timestamp" => Self::Date,
            "double" => Self::Double,
            "float" => Self::Float,
            "integer" | "varint" => Self::Integer,
            "lexicaluuid" | "uuid" => Self::LexicalUuid,
            "long" | "bigint" => Self::Long,
            "timeuuid" => Self::TimeUuid,
            "utf8" | "text" => Self::Utf8,
            _ => {
                return Err(CassError::model(format!("unknown column type: {}", name)));
            }
        };
        Ok(parsed)
    }
}

fn split_top_level(body: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, c) in body.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(body[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    let last = body[start..].trim();
    if !last.is_empty() {
        parts.push(last);
    }
    parts
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.validation_class())
    }
}

impl FromStr for ColumnType {
    type Err = CassError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ColumnType {
    type Error = CassError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<ColumnType> for String {
    fn from(value: ColumnType) -> Self {
        value.validation_class()
    }
}

/// A typed cell value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Ascii(String),
    Boolean(bool),
    Bytes(Vec<u8>),
    Composite(Vec<Value>),
    Counter(i64),
    Date(DateTime<Utc>),
    Double(f64),
    Float(f32),
    Integer(i64),
    Uuid(Uuid),
    Long(i64),
    Utf8(String),
}

impl Value {
    pub fn conforms_to(&self, column_type: &ColumnType) -> bool {
        match (self, column_type) {
            (Self::Ascii(s), ColumnType::Ascii) => s.is_ascii(),
            (Self::Uuid(u), ColumnType::TimeUuid) => is_time_uuid(u),
            (Self::Boolean(_), ColumnType::Boolean)
            | (Self::Bytes(_), ColumnType::Bytes)
            | (Self::Counter(_), ColumnType::CounterColumn)
            | (Self::Date(_), ColumnType::Date)
            | (Self::Double(_), ColumnType::Double)
            | (Self::Float(_), ColumnType::Float)
            | (Self::Integer(_), ColumnType::Integer)
            | (Self::Uuid(_), ColumnType::LexicalUuid)
            | (Self::Long(_), ColumnType::Long)
            | (Self::Utf8(_), ColumnType::Utf8) => true,
            (Self::Composite(values), ColumnType::Composite(types)) => {
                values.len() == types.len()
                    && values.iter().zip(types).all(|(v, t)| v.conforms_to(t))
            }
            _ => false,
        }
    }

    /// The narrowest column type this value conforms to.
    pub fn column_type(&self) -> ColumnType {
        match self {
            Self::Ascii(_) => ColumnType::Ascii,
            Self::Boolean(_) => ColumnType::Boolean,
            Self::Bytes(_) => ColumnType::Bytes,
            Self::Composite(values) => {
                ColumnType::Composite(values.iter().map(Value::column_type).collect())
            }
            Self::Counter(_) => ColumnType::CounterColumn,
            Self::Date(_) => ColumnType::Date,
            Self::Double(_) => ColumnType::Double,
            Self::Float(_) => ColumnType::Float,
            Self::Integer(_) => ColumnType::Integer,
            Self::Uuid(_) => ColumnType::LexicalUuid,
            Self::Long(_) => ColumnType::Long,
            Self::Utf8(_) => ColumnType::Utf8,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Ascii(s) | Self::Utf8(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Bytes(b) => Some(b),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ascii(s) | Self::Utf8(s) => write!(f, "'{}'", s.replace('\'', "''")),
            Self::Boolean(b) => write!(f, "{}", b),
            Self::Bytes(bytes) => {
                write!(f, "0x")?;
                for b in bytes {
                    write!(f, "{:02x}", b)?;
                }
                Ok(())
            }
            Self::Composite(values) => {
                write!(f, "(")?;
                for (i, v) in values.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", v)?;
                }
                write!(f, ")")
            }
            Self::Counter(n) | Self::Integer(n) | Self::Long(n) => write!(f, "{}", n),
            Self::Date(d) => write!(f, "'{}'", d.to_rfc3339()),
            Self::Double(x) => write!(f, "{}", x),
            Self::Float(x) => write!(f, "{}", x),
            Self::Uuid(u) => write!(f, "{}", u),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Utf8(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Utf8(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Long(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Double(value)
    }
}

impl From<Uuid> for Value {
    fn from(value: Uuid) -> Self {
        Self::Uuid(value)
    }
}

impl From<Vec<u8>> for Value {
    fn from(value: Vec<u8>) -> Self {
        Self::Bytes(value)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(value: DateTime<Utc>) -> Self {
        Self::Date(value)
    }
}

/// `TimeUUIDType` only accepts version 1 UUIDs.
pub fn is_time_uuid(uuid: &Uuid) -> bool {
    uuid.get_version_num() == 1
}

/// Orders UUIDs the way a `TimeUUIDType` comparator does: by embedded
/// timestamp, then by bytes.
pub fn compare_time_uuids(left: &Uuid, right: &Uuid) -> Ordering {
    let stamp = |u: &Uuid| u.get_timestamp().map(|ts| ts.to_unix());
    stamp(left)
        .cmp(&stamp(right))
        .then_with(|| left.as_bytes().cmp(right.as_bytes()))
}
