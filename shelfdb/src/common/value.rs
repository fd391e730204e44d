use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use std::cmp::Ordering;
use std::fmt::{Debug, Display, Formatter};

use crate::common::time::{format_iso, parse_iso};
use crate::errors::{ErrorKind, ShelfError, ShelfResult};

/// Represents a single record field value.
///
/// # Purpose
/// Provides a unified representation for every value type the store
/// understands: scalars, enumeration members, timestamps, and lists.
/// All filter evaluation, codecs, and backends operate on this type.
///
/// # Variants
/// - `Null`: absence of a value
/// - `Bool(bool)`: boolean true/false
/// - `Int(i64)`: integer value
/// - `Float(f64)`: floating point value
/// - `Str(String)`: text value
/// - `Enum(String)`: an enumeration member, carried by its textual form
/// - `DateTime(DateTime<Utc>)`: UTC timestamp
/// - `List(Vec<Value>)`: ordered collection of values
///
/// # Cross-type comparison
/// Like document values in other embedded stores, values compare across
/// closely related variants: `Int` and `Float` compare numerically, `Enum`
/// and `Str` compare textually, and `DateTime` compares against `Str`
/// through its ISO-8601 text form (the form timestamps take once stored).
/// `Null` sorts before everything else.
#[derive(Clone, Debug, Default)]
pub enum Value {
    /// Represents a null value.
    #[default]
    Null,
    /// Represents a boolean value.
    Bool(bool),
    /// Represents an integer value.
    Int(i64),
    /// Represents a floating point value.
    Float(f64),
    /// Represents a string value.
    Str(String),
    /// Represents an enumeration member by its textual form.
    Enum(String),
    /// Represents a UTC timestamp.
    DateTime(DateTime<Utc>),
    /// Represents a list of values.
    List(Vec<Value>),
}

// Comparison groups. Values in the same group are mutually comparable;
// values in different groups fall back to group rank for total ordering.
const GROUP_NULL: u8 = 0;
const GROUP_BOOL: u8 = 1;
const GROUP_NUMBER: u8 = 2;
const GROUP_TEXT: u8 = 3;
const GROUP_LIST: u8 = 4;

/// Compare two floats with NaN treated as greater than all other values.
#[inline]
fn num_cmp(a: f64, b: f64) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
    }
}

impl Value {
    /// Returns `true` when the value is `Null`.
    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Returns the integer content, if this value is an integer.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Returns the numeric content as `f64`, if this value is numeric.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Returns the boolean content, if this value is a boolean.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns the string content for `Str` and `Enum` values.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) | Value::Enum(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the timestamp content, if this value is a `DateTime`.
    pub fn as_datetime(&self) -> Option<&DateTime<Utc>> {
        match self {
            Value::DateTime(ts) => Some(ts),
            _ => None,
        }
    }

    /// Returns the list content, if this value is a `List`.
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    /// Returns the textual form of a text-like value.
    ///
    /// `Str` and `Enum` yield their content; `DateTime` yields its ISO-8601
    /// form. Other variants yield `None`.
    pub fn text_form(&self) -> Option<String> {
        match self {
            Value::Str(s) | Value::Enum(s) => Some(s.clone()),
            Value::DateTime(ts) => Some(format_iso(ts)),
            _ => None,
        }
    }

    #[inline]
    fn group(&self) -> u8 {
        match self {
            Value::Null => GROUP_NULL,
            Value::Bool(_) => GROUP_BOOL,
            Value::Int(_) | Value::Float(_) => GROUP_NUMBER,
            Value::Str(_) | Value::Enum(_) | Value::DateTime(_) => GROUP_TEXT,
            Value::List(_) => GROUP_LIST,
        }
    }

    /// Compares two values when they belong to the same comparison group.
    ///
    /// Returns `None` for cross-group pairs (e.g. an integer against a
    /// string). Predicate evaluation treats such pairs as "no match" rather
    /// than inventing an ordering.
    pub fn try_cmp(&self, other: &Value) -> Option<Ordering> {
        if self.group() != other.group() {
            return None;
        }
        Some(self.cmp(other))
    }

    /// Converts this value to its plain-JSON form.
    ///
    /// Enumeration members and timestamps render as strings, which is the
    /// on-disk dialect of the per-record file and document-store backends.
    pub fn to_json(&self) -> JsonValue {
        match self {
            Value::Null => JsonValue::Null,
            Value::Bool(b) => JsonValue::Bool(*b),
            Value::Int(i) => JsonValue::from(*i),
            Value::Float(f) => serde_json::Number::from_f64(*f)
                .map(JsonValue::Number)
                .unwrap_or(JsonValue::Null),
            Value::Str(s) | Value::Enum(s) => JsonValue::String(s.clone()),
            Value::DateTime(ts) => JsonValue::String(format_iso(ts)),
            Value::List(items) => JsonValue::Array(items.iter().map(Value::to_json).collect()),
        }
    }

    /// Builds a value from its plain-JSON form.
    ///
    /// Strings come back as `Str` - the JSON dialect is lossy about `Enum`
    /// and `DateTime`, which is why comparisons treat those variants as
    /// text. Nested objects are not a supported field shape.
    pub fn from_json(json: &JsonValue) -> ShelfResult<Value> {
        match json {
            JsonValue::Null => Ok(Value::Null),
            JsonValue::Bool(b) => Ok(Value::Bool(*b)),
            JsonValue::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Ok(Value::Int(i))
                } else {
                    Ok(Value::Float(n.as_f64().unwrap_or(f64::NAN)))
                }
            }
            JsonValue::String(s) => Ok(Value::Str(s.clone())),
            JsonValue::Array(items) => {
                let values = items
                    .iter()
                    .map(Value::from_json)
                    .collect::<ShelfResult<Vec<Value>>>()?;
                Ok(Value::List(values))
            }
            JsonValue::Object(_) => {
                log::error!("Nested objects are not a supported field value");
                Err(ShelfError::new(
                    "Nested objects are not a supported field value",
                    ErrorKind::SerializationError,
                ))
            }
        }
    }

    /// Parses an ISO-8601 string into a `DateTime` value.
    pub fn datetime_from_iso(text: &str) -> ShelfResult<Value> {
        Ok(Value::DateTime(parse_iso(text)?))
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            _ => {
                if self.group() != other.group() {
                    return false;
                }
                self.cmp(other) == Ordering::Equal
            }
        }
    }
}

impl Eq for Value {}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        let (lg, rg) = (self.group(), other.group());
        if lg != rg {
            return lg.cmp(&rg);
        }
        match lg {
            GROUP_NULL => Ordering::Equal,
            GROUP_BOOL => self.as_bool().cmp(&other.as_bool()),
            GROUP_NUMBER => match (self, other) {
                (Value::Int(a), Value::Int(b)) => a.cmp(b),
                _ => num_cmp(
                    self.as_f64().unwrap_or(f64::NAN),
                    other.as_f64().unwrap_or(f64::NAN),
                ),
            },
            GROUP_TEXT => match (self, other) {
                (Value::DateTime(a), Value::DateTime(b)) => a.cmp(b),
                _ => self
                    .text_form()
                    .unwrap_or_default()
                    .cmp(&other.text_form().unwrap_or_default()),
            },
            _ => match (self, other) {
                (Value::List(a), Value::List(b)) => a.cmp(b),
                _ => Ordering::Equal,
            },
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(v) => write!(f, "{}", v),
            Value::Str(s) => write!(f, "{}", s),
            Value::Enum(s) => write!(f, "{}", s),
            Value::DateTime(ts) => write!(f, "{}", format_iso(ts)),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v as i64)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Value::DateTime(v)
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Value::List(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(inner) => inner.into(),
            None => Value::Null,
        }
    }
}
