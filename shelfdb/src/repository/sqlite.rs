use chrono::Utc;
use parking_lot::Mutex;
use rusqlite::Connection;
use std::path::Path;
use std::sync::Arc;

use crate::common::{
    Record, SortOrder, Value, FIELD_CREATED_AT, FIELD_DELETED_AT, FIELD_ID, FIELD_UPDATED_AT,
};
use crate::errors::{ErrorKind, ShelfError, ShelfResult};
use crate::filter::FilterSpec;
use crate::repository::{
    paginate_sorted, sanitize_patch, stamp_new, FindOptions, Page, RecordId, Repository,
};
use crate::sql::{codec, col, compile_spec, SqlBuilder, SqlExpr, SqlOutput, SqlRow, TableSchema};

/// The relational backend, over SQLite.
///
/// Construction runs schema synthesis once: the descriptor's
/// `CREATE TABLE IF NOT EXISTS` statement, with column types inferred from
/// the field defaults. Every write serializes field values through the
/// value codec; every read decodes them back using the column types.
/// Filters compile into a parameterized WHERE expression tree.
///
/// `atomic` maps onto the engine's native transaction primitives.
///
/// # Examples
///
/// ```rust,ignore
/// use shelfdb::repository::SqliteRepository;
/// use shelfdb::sql::TableSchema;
/// use shelfdb::common::Value;
///
/// let schema = TableSchema::new(
///     "game_backlogs",
///     vec![("title", Value::from("")), ("entries", Value::List(vec![]))],
/// )?;
/// let repo = SqliteRepository::open_in_memory(schema)?;
/// ```
#[derive(Clone)]
pub struct SqliteRepository {
    inner: Arc<SqliteInner>,
}

struct SqliteInner {
    conn: Mutex<Connection>,
    schema: TableSchema,
}

impl SqliteRepository {
    /// Opens (or creates) a database file and synthesizes the table.
    pub fn open<P: AsRef<Path>>(path: P, schema: TableSchema) -> ShelfResult<SqliteRepository> {
        Self::with_connection(Connection::open(path.as_ref())?, schema)
    }

    /// Opens a transient in-memory database and synthesizes the table.
    pub fn open_in_memory(schema: TableSchema) -> ShelfResult<SqliteRepository> {
        Self::with_connection(Connection::open_in_memory()?, schema)
    }

    fn with_connection(conn: Connection, schema: TableSchema) -> ShelfResult<SqliteRepository> {
        // SQLite's LIKE is case-insensitive for ASCII by default, which
        // would collapse `contains` and `icontains` into one behavior
        conn.execute_batch("PRAGMA case_sensitive_like = ON;")?;
        let ddl = schema.create_table_sql();
        log::debug!("Synthesizing schema: {}", ddl);
        conn.execute_batch(&ddl)?;

        Ok(SqliteRepository {
            inner: Arc::new(SqliteInner {
                conn: Mutex::new(conn),
                schema,
            }),
        })
    }

    /// The table descriptor this repository was built from.
    pub fn schema(&self) -> &TableSchema {
        &self.inner.schema
    }

    fn decode_row(&self, row: &SqlRow) -> ShelfResult<Record> {
        let mut record = Record::new();
        for (column, stored) in row.iter() {
            let column_type = self.inner.schema.column_type(column).ok_or_else(|| {
                ShelfError::new(
                    &format!("Result row carries undeclared column {}", column),
                    ErrorKind::InternalError,
                )
            })?;
            record.put(column, codec::decode(stored, column_type)?);
        }
        Ok(record)
    }

    fn decode_rows(&self, rows: Vec<SqlRow>) -> ShelfResult<Vec<Record>> {
        rows.iter().map(|row| self.decode_row(row)).collect()
    }

    /// Collects the insert/update assignments for a record: the reserved
    /// timestamp fields plus every declared field the record carries.
    /// Fields absent from the record are omitted so column defaults apply.
    fn assignments(&self, record: &Record, builder: SqlBuilder) -> SqlBuilder {
        let mut builder = builder;
        for reserved in [FIELD_CREATED_AT, FIELD_UPDATED_AT, FIELD_DELETED_AT] {
            if let Some(value) = record.get_opt(reserved) {
                builder = builder.set(reserved, value.clone());
            }
        }
        for field in self.inner.schema.fields() {
            if let Some(value) = record.get_opt(&field.name) {
                builder = builder.set(&field.name, value.clone());
            }
        }
        builder
    }

    fn fetch_by_id(&self, conn: &Connection, id: RecordId) -> ShelfResult<Option<Record>> {
        let rows = SqlBuilder::select(self.inner.schema.table())
            .where_expr(col(FIELD_ID).eq(id))
            .run(conn)?
            .rows();
        match rows.first() {
            Some(row) => Ok(Some(self.decode_row(row)?)),
            None => Ok(None),
        }
    }
}

impl Repository for SqliteRepository {
    fn create(&self, record: &Record) -> ShelfResult<Record> {
        let stamped = stamp_new(record)?;
        let conn = self.inner.conn.lock();

        let output = self
            .assignments(&stamped, SqlBuilder::insert(self.inner.schema.table()))
            .run(&conn)?;
        let id = match output {
            SqlOutput::Inserted(id) => id,
            _ => {
                return Err(ShelfError::new(
                    "INSERT did not yield a row id",
                    ErrorKind::BackendError,
                ))
            }
        };

        let created = self.fetch_by_id(&conn, id)?.ok_or_else(|| {
            ShelfError::new(
                "Inserted row vanished before read-back",
                ErrorKind::BackendError,
            )
        })?;
        log::debug!("Created row: {}", created);
        Ok(created)
    }

    fn update(&self, id: RecordId, patch: &Record) -> ShelfResult<Record> {
        let sanitized = sanitize_patch(patch);
        let conn = self.inner.conn.lock();

        let output = self
            .assignments(&sanitized, SqlBuilder::update(self.inner.schema.table()))
            .where_expr(col(FIELD_ID).eq(id))
            .run(&conn)?;
        let affected = match output {
            SqlOutput::Affected(count) => count,
            _ => 0,
        };
        if affected == 0 {
            log::error!("Cannot update: row with id {} not found", id);
            return Err(ShelfError::new(
                &format!("Record with id {} not found", id),
                ErrorKind::NotFound,
            ));
        }

        let updated = self.fetch_by_id(&conn, id)?.ok_or_else(|| {
            ShelfError::new(
                "Updated row vanished before read-back",
                ErrorKind::BackendError,
            )
        })?;
        log::debug!("Updated row: {}", updated);
        Ok(updated)
    }

    fn delete(&self, id: RecordId, soft: bool) -> ShelfResult<bool> {
        let conn = self.inner.conn.lock();
        let output = if soft {
            SqlBuilder::update(self.inner.schema.table())
                .set(FIELD_DELETED_AT, Utc::now())
                .where_expr(col(FIELD_ID).eq(id))
                .run(&conn)?
        } else {
            SqlBuilder::delete(self.inner.schema.table())
                .where_expr(col(FIELD_ID).eq(id))
                .run(&conn)?
        };
        match output {
            SqlOutput::Affected(count) => Ok(count > 0),
            _ => Ok(false),
        }
    }

    fn get_by_id(&self, id: RecordId) -> ShelfResult<Option<Record>> {
        let conn = self.inner.conn.lock();
        self.fetch_by_id(&conn, id)
    }

    fn get_many_by_ids(&self, ids: &[RecordId]) -> ShelfResult<Vec<Record>> {
        let values = ids.iter().map(|id| Value::Int(*id)).collect();
        let conn = self.inner.conn.lock();
        let rows = SqlBuilder::select(self.inner.schema.table())
            .where_expr(col(FIELD_ID).one_of(values))
            .run(&conn)?
            .rows();
        self.decode_rows(rows)
    }

    fn list_all(&self) -> ShelfResult<Vec<Record>> {
        let conn = self.inner.conn.lock();
        let rows = SqlBuilder::select(self.inner.schema.table())
            .order_by(FIELD_ID, SortOrder::Ascending)
            .run(&conn)?
            .rows();
        self.decode_rows(rows)
    }

    fn exists(&self, spec: &FilterSpec) -> ShelfResult<bool> {
        let conn = self.inner.conn.lock();
        let mut builder = SqlBuilder::select(self.inner.schema.table())
            .columns(&[FIELD_ID])
            .limit(1);
        if let Some(expr) = compile_spec(spec)? {
            builder = builder.where_expr(expr);
        }
        Ok(!builder.run(&conn)?.rows().is_empty())
    }

    fn count(&self, spec: &FilterSpec) -> ShelfResult<usize> {
        let conn = self.inner.conn.lock();
        let mut builder = SqlBuilder::select(self.inner.schema.table()).columns(&[FIELD_ID]);
        if let Some(expr) = compile_spec(spec)? {
            builder = builder.where_expr(expr);
        }
        Ok(builder.run(&conn)?.rows().len())
    }

    fn filter(&self, spec: &FilterSpec, options: &FindOptions) -> ShelfResult<Page> {
        log::debug!(
            "Filtering table {} with: {}",
            self.inner.schema.table(),
            spec
        );

        let mut where_expr = compile_spec(spec)?;
        let mut builder = SqlBuilder::select(self.inner.schema.table());

        if let Some(order_field) = &options.order_by {
            // an unknown order field cannot hold a non-null value anywhere
            if self.inner.schema.column_type(order_field).is_none() {
                return Ok(Page {
                    items: vec![],
                    total: 0,
                    has_next: false,
                    next_cursor: None,
                });
            }
            // ordering drops rows whose order field is null, exactly as
            // the shared in-memory pipeline does
            let null_drop: SqlExpr = col(order_field).is_not_null();
            where_expr = Some(match where_expr {
                Some(expr) => expr.and(null_drop),
                None => null_drop,
            });
            builder = builder.order_by(order_field, options.order);
        } else {
            builder = builder.order_by(FIELD_ID, SortOrder::Ascending);
        }

        if let Some(expr) = where_expr {
            builder = builder.where_expr(expr);
        }

        let conn = self.inner.conn.lock();
        let rows = builder.run(&conn)?.rows();
        drop(conn);

        let records = self.decode_rows(rows)?;
        // the engine already ordered the rows; only the cursor/offset/
        // limit slice remains, shared with every other backend
        Ok(paginate_sorted(records, options))
    }

    fn atomic(&self, work: &mut dyn FnMut() -> ShelfResult<()>) -> ShelfResult<()> {
        {
            let conn = self.inner.conn.lock();
            conn.execute_batch("BEGIN")?;
        }
        match work() {
            Ok(()) => {
                let conn = self.inner.conn.lock();
                conn.execute_batch("COMMIT")?;
                Ok(())
            }
            Err(err) => {
                log::warn!("Atomic scope failed, rolling back: {}", err);
                let conn = self.inner.conn.lock();
                conn.execute_batch("ROLLBACK")?;
                Err(err)
            }
        }
    }
}
