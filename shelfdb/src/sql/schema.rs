use std::fmt::{Display, Formatter};

use crate::common::{Value, FIELD_CREATED_AT, FIELD_DELETED_AT, FIELD_ID, FIELD_UPDATED_AT};
use crate::common::time::format_iso;
use crate::errors::{ErrorKind, ShelfError, ShelfResult};

/// Column type descriptor for the relational backend.
///
/// The descriptor is an explicit tagged union built once per record-type
/// registration - the column type of every declared field is inferred from
/// the runtime variant of its sample default value, and fixed from then
/// on.
///
/// # Variants and affinities
/// - `Text` (TEXT): string fields
/// - `Integer` (INTEGER): integer fields
/// - `Real` (REAL): floating point fields
/// - `JsonList` (TEXT): list fields, stored as a JSON-encoded array
/// - `Enum` (TEXT): enumeration fields, stored as the member's text form
/// - `DateTimeIso` (TEXT): timestamp fields, stored as ISO-8601 text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Text,
    Integer,
    Real,
    JsonList,
    Enum,
    DateTimeIso,
}

impl ColumnType {
    /// Selects a column type from a sample default value's runtime
    /// variant.
    ///
    /// Null and boolean defaults are not inferable field shapes and fail
    /// with `SchemaError`.
    pub fn infer(default: &Value) -> ShelfResult<ColumnType> {
        match default {
            Value::Str(_) => Ok(ColumnType::Text),
            Value::Int(_) => Ok(ColumnType::Integer),
            Value::Float(_) => Ok(ColumnType::Real),
            Value::List(_) => Ok(ColumnType::JsonList),
            Value::Enum(_) => Ok(ColumnType::Enum),
            Value::DateTime(_) => Ok(ColumnType::DateTimeIso),
            other => {
                log::error!("Cannot infer a column type from default value: {:?}", other);
                Err(ShelfError::new(
                    &format!("Cannot infer a column type from default value: {}", other),
                    ErrorKind::SchemaError,
                ))
            }
        }
    }

    /// The SQLite column affinity keyword for this type.
    pub fn affinity(&self) -> &'static str {
        match self {
            ColumnType::Integer => "INTEGER",
            ColumnType::Real => "REAL",
            ColumnType::Text | ColumnType::JsonList | ColumnType::Enum | ColumnType::DateTimeIso => {
                "TEXT"
            }
        }
    }
}

impl Display for ColumnType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ColumnType::Text => write!(f, "text"),
            ColumnType::Integer => write!(f, "integer"),
            ColumnType::Real => write!(f, "real"),
            ColumnType::JsonList => write!(f, "json-list"),
            ColumnType::Enum => write!(f, "enum"),
            ColumnType::DateTimeIso => write!(f, "datetime-iso"),
        }
    }
}

/// One declared field of a table schema.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDef {
    pub name: String,
    pub column_type: ColumnType,
    pub default: Value,
}

/// A table descriptor for the relational backend: a named table plus an
/// ordered set of field definitions.
///
/// Descriptors are immutable once built; the backend runs schema synthesis
/// for a descriptor exactly once, at repository construction, and no
/// migrations are supported afterwards.
///
/// # Examples
///
/// ```rust,ignore
/// use shelfdb::sql::TableSchema;
/// use shelfdb::common::Value;
///
/// let schema = TableSchema::new(
///     "game_metadatas",
///     vec![
///         ("title", Value::from("")),
///         ("avg_completion_time", Value::Float(0.0)),
///         ("genres", Value::List(vec![])),
///     ],
/// )?;
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct TableSchema {
    table: String,
    fields: Vec<FieldDef>,
}

impl TableSchema {
    /// Builds a descriptor, inferring every column type from its field's
    /// default value.
    ///
    /// Fails with `SchemaError` when the table name is empty, no fields
    /// are declared, or a default value's type is not inferable.
    pub fn new(table: &str, fields: Vec<(&str, Value)>) -> ShelfResult<TableSchema> {
        if table.trim().is_empty() {
            log::error!("Table descriptor is missing a table name");
            return Err(ShelfError::new(
                "Table descriptor is missing a table name",
                ErrorKind::SchemaError,
            ));
        }
        if fields.is_empty() {
            log::error!("Table descriptor {} declares no fields", table);
            return Err(ShelfError::new(
                &format!("Table descriptor {} declares no fields", table),
                ErrorKind::SchemaError,
            ));
        }

        let mut defs = Vec::with_capacity(fields.len());
        for (name, default) in fields {
            let column_type = ColumnType::infer(&default)?;
            defs.push(FieldDef {
                name: name.to_string(),
                column_type,
                default,
            });
        }
        Ok(TableSchema {
            table: table.to_string(),
            fields: defs,
        })
    }

    /// The table name.
    pub fn table(&self) -> &str {
        &self.table
    }

    /// The declared fields, in declaration order.
    pub fn fields(&self) -> &[FieldDef] {
        &self.fields
    }

    /// Looks up a declared field by name.
    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// The column type of any column of the synthesized table, including
    /// the fixed `id` and timestamp columns.
    pub fn column_type(&self, name: &str) -> Option<ColumnType> {
        match name {
            FIELD_ID => Some(ColumnType::Integer),
            FIELD_CREATED_AT | FIELD_UPDATED_AT | FIELD_DELETED_AT => Some(ColumnType::DateTimeIso),
            _ => self.field(name).map(|f| f.column_type),
        }
    }

    /// Every column of the synthesized table: the fixed columns first,
    /// then the declared fields in order.
    pub fn column_names(&self) -> Vec<&str> {
        let mut names = vec![FIELD_ID, FIELD_CREATED_AT, FIELD_UPDATED_AT, FIELD_DELETED_AT];
        names.extend(self.fields.iter().map(|f| f.name.as_str()));
        names
    }

    /// Renders the idempotent table-creation statement for this
    /// descriptor.
    ///
    /// The statement carries an auto-incrementing integer primary key and
    /// the fixed timestamp columns, then one column per declared field
    /// with a DEFAULT literal mirroring the field's default value. An
    /// empty-list default emits no DEFAULT clause. Safe to run
    /// repeatedly.
    pub fn create_table_sql(&self) -> String {
        let mut sql = format!("CREATE TABLE IF NOT EXISTS {} (", self.table);
        sql.push_str("id INTEGER PRIMARY KEY AUTOINCREMENT, ");
        sql.push_str("created_at TEXT, ");
        sql.push_str("updated_at TEXT, ");
        sql.push_str("deleted_at TEXT");
        for field in &self.fields {
            sql.push_str(", ");
            sql.push_str(&field.name);
            sql.push(' ');
            sql.push_str(field.column_type.affinity());
            if let Some(literal) = default_literal(field) {
                sql.push_str(" DEFAULT ");
                sql.push_str(&literal);
            }
        }
        sql.push_str(");");
        sql
    }
}

impl Display for TableSchema {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}(", self.table)?;
        for (i, field) in self.fields.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}: {}", field.name, field.column_type)?;
        }
        write!(f, ")")
    }
}

/// Renders the DEFAULT literal for a field, or `None` when the field
/// should have no DEFAULT clause.
fn default_literal(field: &FieldDef) -> Option<String> {
    match &field.default {
        Value::Str(s) | Value::Enum(s) => Some(quote(s)),
        Value::Int(i) => Some(i.to_string()),
        Value::Float(v) => Some(v.to_string()),
        Value::DateTime(ts) => Some(quote(&format_iso(ts))),
        Value::List(items) => {
            if items.is_empty() {
                return None;
            }
            let json = Value::List(items.clone()).to_json();
            Some(quote(&json.to_string()))
        }
        _ => None,
    }
}

/// Single-quotes a string literal for embedding in DDL, doubling any
/// embedded quote.
fn quote(text: &str) -> String {
    format!("'{}'", text.replace('\'', "''"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use chrono::Utc;

    fn backlog_schema() -> TableSchema {
        TableSchema::new(
            "game_backlog_entries",
            vec![
                ("meta_data", Value::Int(0)),
                ("priority", Value::Enum("p0".into())),
                ("status", Value::Enum("inbox".into())),
                ("backlog", Value::Int(0)),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_infer_column_types() {
        assert_eq!(ColumnType::infer(&Value::from("")).unwrap(), ColumnType::Text);
        assert_eq!(ColumnType::infer(&Value::Int(0)).unwrap(), ColumnType::Integer);
        assert_eq!(ColumnType::infer(&Value::Float(0.0)).unwrap(), ColumnType::Real);
        assert_eq!(
            ColumnType::infer(&Value::List(vec![])).unwrap(),
            ColumnType::JsonList
        );
        assert_eq!(
            ColumnType::infer(&Value::Enum("inbox".into())).unwrap(),
            ColumnType::Enum
        );
        let ts = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(
            ColumnType::infer(&Value::DateTime(ts)).unwrap(),
            ColumnType::DateTimeIso
        );
    }

    #[test]
    fn test_infer_rejects_null_and_bool() {
        assert!(ColumnType::infer(&Value::Null).is_err());
        assert!(ColumnType::infer(&Value::Bool(true)).is_err());
    }

    #[test]
    fn test_empty_table_name_is_schema_error() {
        let result = TableSchema::new("", vec![("title", Value::from(""))]);
        assert!(result.is_err());
        assert_eq!(result.unwrap_err().kind(), &ErrorKind::SchemaError);
    }

    #[test]
    fn test_no_fields_is_schema_error() {
        let result = TableSchema::new("games", vec![]);
        assert!(result.is_err());
        assert_eq!(result.unwrap_err().kind(), &ErrorKind::SchemaError);
    }

    #[test]
    fn test_create_table_sql_shape() {
        let schema = backlog_schema();
        let sql = schema.create_table_sql();
        assert!(sql.starts_with("CREATE TABLE IF NOT EXISTS game_backlog_entries ("));
        assert!(sql.contains("id INTEGER PRIMARY KEY AUTOINCREMENT"));
        assert!(sql.contains("created_at TEXT"));
        assert!(sql.contains("updated_at TEXT"));
        assert!(sql.contains("deleted_at TEXT"));
        assert!(sql.contains("meta_data INTEGER DEFAULT 0"));
        assert!(sql.contains("priority TEXT DEFAULT 'p0'"));
        assert!(sql.ends_with(");"));
    }

    #[test]
    fn test_empty_list_default_has_no_default_clause() {
        let schema = TableSchema::new("game_backlogs", vec![("entries", Value::List(vec![]))])
            .unwrap();
        let sql = schema.create_table_sql();
        assert!(sql.contains("entries TEXT"));
        assert!(!sql.contains("entries TEXT DEFAULT"));
    }

    #[test]
    fn test_non_empty_list_default_renders_json_array() {
        let schema = TableSchema::new(
            "games",
            vec![(
                "genres",
                Value::List(vec![Value::Enum("rpg".into()), Value::Enum("indie".into())]),
            )],
        )
        .unwrap();
        let sql = schema.create_table_sql();
        assert!(sql.contains(r#"genres TEXT DEFAULT '["rpg","indie"]'"#));
    }

    #[test]
    fn test_string_default_quoting_escapes_quotes() {
        let schema =
            TableSchema::new("games", vec![("title", Value::from("it's a game"))]).unwrap();
        let sql = schema.create_table_sql();
        assert!(sql.contains("title TEXT DEFAULT 'it''s a game'"));
    }

    #[test]
    fn test_datetime_default_renders_iso_literal() {
        let ts = Utc.with_ymd_and_hms(2001, 1, 1, 0, 0, 0).unwrap();
        let schema =
            TableSchema::new("games", vec![("release_date", Value::DateTime(ts))]).unwrap();
        let sql = schema.create_table_sql();
        assert!(sql.contains("release_date TEXT DEFAULT '2001-01-01T00:00:00.000000Z'"));
    }

    #[test]
    fn test_column_type_lookup_covers_fixed_columns() {
        let schema = backlog_schema();
        assert_eq!(schema.column_type("id"), Some(ColumnType::Integer));
        assert_eq!(schema.column_type("created_at"), Some(ColumnType::DateTimeIso));
        assert_eq!(schema.column_type("deleted_at"), Some(ColumnType::DateTimeIso));
        assert_eq!(schema.column_type("status"), Some(ColumnType::Enum));
        assert_eq!(schema.column_type("unknown"), None);
    }

    #[test]
    fn test_column_names_order() {
        let schema = backlog_schema();
        assert_eq!(
            schema.column_names(),
            vec![
                "id",
                "created_at",
                "updated_at",
                "deleted_at",
                "meta_data",
                "priority",
                "status",
                "backlog"
            ]
        );
    }
}
