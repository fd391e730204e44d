use rusqlite::types::Value as SqlValue;

use crate::common::time::{format_iso, parse_iso};
use crate::common::Value;
use crate::errors::{ErrorKind, ShelfError, ShelfResult};
use crate::sql::schema::ColumnType;

/// Serializes a field value for storage in the relational engine.
///
/// Lists become JSON text, timestamps ISO-8601 text, enumeration members
/// their text form; ordinary scalars pass through untouched. This codec
/// runs before every write, and [`decode`] reverses it on every read -
/// the pair is bijective for all supported field types.
pub fn encode(value: &Value) -> ShelfResult<SqlValue> {
    match value {
        Value::Null => Ok(SqlValue::Null),
        Value::Bool(b) => Ok(SqlValue::Integer(*b as i64)),
        Value::Int(i) => Ok(SqlValue::Integer(*i)),
        Value::Float(f) => Ok(SqlValue::Real(*f)),
        Value::Str(s) | Value::Enum(s) => Ok(SqlValue::Text(s.clone())),
        Value::DateTime(ts) => Ok(SqlValue::Text(format_iso(ts))),
        Value::List(_) => {
            let json = value.to_json();
            Ok(SqlValue::Text(serde_json::to_string(&json)?))
        }
    }
}

/// Deserializes a stored column value back into a field value, using the
/// column's schema type to reverse the encoding exactly.
pub fn decode(stored: &SqlValue, column_type: ColumnType) -> ShelfResult<Value> {
    match stored {
        SqlValue::Null => Ok(Value::Null),
        SqlValue::Integer(i) => match column_type {
            ColumnType::Integer => Ok(Value::Int(*i)),
            ColumnType::Real => Ok(Value::Float(*i as f64)),
            _ => Err(mismatch(stored, column_type)),
        },
        SqlValue::Real(f) => match column_type {
            ColumnType::Real => Ok(Value::Float(*f)),
            _ => Err(mismatch(stored, column_type)),
        },
        SqlValue::Text(s) => match column_type {
            ColumnType::Text => Ok(Value::Str(s.clone())),
            ColumnType::Enum => Ok(Value::Enum(s.clone())),
            ColumnType::DateTimeIso => {
                let ts = parse_iso(s).map_err(|err| {
                    ShelfError::new_with_cause(
                        &format!("Stored timestamp is not ISO-8601: {}", s),
                        ErrorKind::SerializationError,
                        err,
                    )
                })?;
                Ok(Value::DateTime(ts))
            }
            ColumnType::JsonList => {
                let json: serde_json::Value = serde_json::from_str(s).map_err(|err| {
                    ShelfError::new_with_cause(
                        &format!("Stored list is not valid JSON: {}", s),
                        ErrorKind::SerializationError,
                        err.into(),
                    )
                })?;
                match Value::from_json(&json)? {
                    Value::List(items) => Ok(Value::List(items)),
                    _ => Err(ShelfError::new(
                        &format!("Stored list column does not hold a JSON array: {}", s),
                        ErrorKind::SerializationError,
                    )),
                }
            }
            _ => Err(mismatch(stored, column_type)),
        },
        SqlValue::Blob(_) => Err(mismatch(stored, column_type)),
    }
}

fn mismatch(stored: &SqlValue, column_type: ColumnType) -> ShelfError {
    log::error!(
        "Stored value {:?} does not match column type {}",
        stored,
        column_type
    );
    ShelfError::new(
        &format!("Stored value does not match column type {}", column_type),
        ErrorKind::SerializationError,
    )
}
