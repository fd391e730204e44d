use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde_json::Value as JsonValue;
use std::fmt::{Display, Formatter};

use crate::common::time::{looks_like_iso, parse_iso};
use crate::common::Value;
use crate::errors::{ErrorKind, ShelfError, ShelfResult};

/// Name of the backend-assigned identifier field.
pub const FIELD_ID: &str = "id";
/// Name of the creation timestamp field.
pub const FIELD_CREATED_AT: &str = "created_at";
/// Name of the last-update timestamp field.
pub const FIELD_UPDATED_AT: &str = "updated_at";
/// Name of the soft-deletion marker field.
pub const FIELD_DELETED_AT: &str = "deleted_at";

/// A persisted entity: an ordered map of named field values.
///
/// Every record carries the reserved fields `id`, `created_at`,
/// `updated_at`, and optionally `deleted_at`. The backend owns all four -
/// ids are assigned on create and immutable afterwards, timestamps are
/// stamped by the repository and never trusted from caller input.
///
/// # Examples
///
/// ```rust,ignore
/// use shelfdb::common::{Record, Value};
///
/// let record = Record::new()
///     .with("title", "Hollow Knight")
///     .with("score", 95i64);
/// assert_eq!(record.get("title"), Value::from("Hollow Knight"));
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Record {
    fields: IndexMap<String, Value>,
}

impl Record {
    /// Creates an empty record.
    pub fn new() -> Self {
        Record {
            fields: IndexMap::new(),
        }
    }

    /// Sets a field and returns the record, for fluent construction.
    pub fn with<V: Into<Value>>(mut self, field: &str, value: V) -> Self {
        self.fields.insert(field.to_string(), value.into());
        self
    }

    /// Sets a field in place.
    pub fn put<V: Into<Value>>(&mut self, field: &str, value: V) {
        self.fields.insert(field.to_string(), value.into());
    }

    /// Gets a field value, yielding `Value::Null` for absent fields.
    ///
    /// Filters treat absent and null fields identically, so this is the
    /// accessor every evaluator path uses.
    pub fn get(&self, field: &str) -> Value {
        self.fields.get(field).cloned().unwrap_or(Value::Null)
    }

    /// Gets a reference to a field value, if the field is present.
    pub fn get_opt(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Removes a field, returning its previous value.
    pub fn remove(&mut self, field: &str) -> Option<Value> {
        self.fields.shift_remove(field)
    }

    /// Returns `true` when the field is present (even if null).
    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    /// Iterates over the fields in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.fields.iter()
    }

    /// Number of fields in the record.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns `true` when the record has no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// The backend-assigned id, when present.
    pub fn id(&self) -> Option<i64> {
        self.fields.get(FIELD_ID).and_then(Value::as_int)
    }

    /// Sets the id field.
    pub fn set_id(&mut self, id: i64) {
        self.fields.insert(FIELD_ID.to_string(), Value::Int(id));
    }

    /// The creation timestamp, when present.
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.fields
            .get(FIELD_CREATED_AT)
            .and_then(Value::as_datetime)
            .copied()
    }

    /// The last-update timestamp, when present.
    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.fields
            .get(FIELD_UPDATED_AT)
            .and_then(Value::as_datetime)
            .copied()
    }

    /// The soft-deletion marker, when present and non-null.
    pub fn deleted_at(&self) -> Option<DateTime<Utc>> {
        self.fields
            .get(FIELD_DELETED_AT)
            .and_then(Value::as_datetime)
            .copied()
    }

    /// Merges the fields of `patch` onto this record.
    pub fn merge(&mut self, patch: &Record) {
        for (field, value) in patch.iter() {
            self.fields.insert(field.clone(), value.clone());
        }
    }

    /// Serializes the record to its plain-JSON object form.
    ///
    /// Timestamps render as ISO-8601 strings and enumeration fields as
    /// their member name - the on-disk layout of the per-record file and
    /// document-store backends.
    pub fn to_json(&self) -> JsonValue {
        let mut map = serde_json::Map::new();
        for (field, value) in self.fields.iter() {
            map.insert(field.clone(), value.to_json());
        }
        JsonValue::Object(map)
    }

    /// Rebuilds a record from its plain-JSON object form.
    ///
    /// Fields named `*_at` that hold a parseable ISO-8601 string are
    /// revived to `DateTime` values; every other string stays a string.
    pub fn from_json(json: &JsonValue) -> ShelfResult<Record> {
        let map = json.as_object().ok_or_else(|| {
            log::error!("Record document is not a JSON object: {}", json);
            ShelfError::new(
                "Record document is not a JSON object",
                ErrorKind::SerializationError,
            )
        })?;

        let mut record = Record::new();
        for (field, json_value) in map.iter() {
            let mut value = Value::from_json(json_value)?;
            if field.ends_with("_at") {
                if let Value::Str(text) = &value {
                    if looks_like_iso(text) {
                        value = Value::DateTime(parse_iso(text)?);
                    }
                }
            }
            record.fields.insert(field.clone(), value);
        }
        Ok(record)
    }
}

impl Display for Record {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_json())
    }
}

impl FromIterator<(String, Value)> for Record {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Record {
            fields: iter.into_iter().collect(),
        }
    }
}
