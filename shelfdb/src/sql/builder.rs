use indexmap::IndexMap;
use rusqlite::types::Value as SqlValue;
use rusqlite::Connection;

use crate::common::{SortOrder, Value};
use crate::errors::{ErrorKind, ShelfError, ShelfResult};
use crate::sql::codec;
use crate::sql::expr::SqlExpr;

/// A result row: column name to stored value, in selection order.
pub type SqlRow = IndexMap<String, SqlValue>;

/// What a statement produced when run.
#[derive(Debug)]
pub enum SqlOutput {
    /// SELECT: the decoded result rows.
    Rows(Vec<SqlRow>),
    /// INSERT: the newly assigned row id.
    Inserted(i64),
    /// UPDATE / DELETE: the number of affected rows.
    Affected(usize),
}

impl SqlOutput {
    /// The rows of a SELECT, or an empty list for other statement kinds.
    pub fn rows(self) -> Vec<SqlRow> {
        match self {
            SqlOutput::Rows(rows) => rows,
            _ => vec![],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StatementKind {
    Select,
    Insert,
    Update,
    Delete,
}

/// A fluent single-statement SQL builder.
///
/// A builder accumulates one statement kind and its clauses - columns,
/// WHERE expression tree, ORDER BY, LIMIT, OFFSET - and [`SqlBuilder::run`]
/// renders and executes the accumulated text against the relational
/// engine. Values always travel as `?` parameters, never as interpolated
/// text.
///
/// # Examples
///
/// ```rust,ignore
/// use shelfdb::sql::{col, SqlBuilder};
/// use shelfdb::common::SortOrder;
///
/// let rows = SqlBuilder::select("games")
///     .where_expr(col("score").gt(20i64))
///     .order_by("score", SortOrder::Descending)
///     .limit(10)
///     .run(&conn)?
///     .rows();
/// ```
pub struct SqlBuilder {
    kind: StatementKind,
    table: String,
    columns: Vec<String>,
    assignments: Vec<(String, Value)>,
    where_expr: Option<SqlExpr>,
    order: Option<(String, SortOrder)>,
    limit: Option<usize>,
    offset: Option<usize>,
}

impl SqlBuilder {
    fn new(kind: StatementKind, table: &str) -> SqlBuilder {
        SqlBuilder {
            kind,
            table: table.to_string(),
            columns: vec![],
            assignments: vec![],
            where_expr: None,
            order: None,
            limit: None,
            offset: None,
        }
    }

    /// Starts a SELECT statement; all columns unless narrowed with
    /// [`SqlBuilder::columns`].
    pub fn select(table: &str) -> SqlBuilder {
        SqlBuilder::new(StatementKind::Select, table)
    }

    /// Starts an INSERT statement; add values with [`SqlBuilder::set`].
    pub fn insert(table: &str) -> SqlBuilder {
        SqlBuilder::new(StatementKind::Insert, table)
    }

    /// Starts an UPDATE statement; add assignments with
    /// [`SqlBuilder::set`].
    pub fn update(table: &str) -> SqlBuilder {
        SqlBuilder::new(StatementKind::Update, table)
    }

    /// Starts a DELETE statement.
    pub fn delete(table: &str) -> SqlBuilder {
        SqlBuilder::new(StatementKind::Delete, table)
    }

    /// Narrows a SELECT to the named columns.
    pub fn columns(mut self, columns: &[&str]) -> SqlBuilder {
        self.columns = columns.iter().map(|c| c.to_string()).collect();
        self
    }

    /// Adds a column value for INSERT, or an assignment for UPDATE.
    /// The value is serialized through the value codec at render time.
    pub fn set<V: Into<Value>>(mut self, column: &str, value: V) -> SqlBuilder {
        self.assignments.push((column.to_string(), value.into()));
        self
    }

    /// Attaches a WHERE expression tree.
    pub fn where_expr(mut self, expr: SqlExpr) -> SqlBuilder {
        self.where_expr = Some(expr);
        self
    }

    /// Orders a SELECT by a column.
    pub fn order_by(mut self, column: &str, order: SortOrder) -> SqlBuilder {
        self.order = Some((column.to_string(), order));
        self
    }

    /// Limits the number of rows a SELECT returns.
    pub fn limit(mut self, limit: usize) -> SqlBuilder {
        self.limit = Some(limit);
        self
    }

    /// Skips rows at the start of a SELECT.
    pub fn offset(mut self, offset: usize) -> SqlBuilder {
        self.offset = Some(offset);
        self
    }

    /// Renders the accumulated statement and executes it.
    pub fn run(&self, conn: &Connection) -> ShelfResult<SqlOutput> {
        let (sql, params) = self.render()?;
        log::debug!("Running SQL: {}", sql);

        match self.kind {
            StatementKind::Select => {
                let mut stmt = conn.prepare(&sql)?;
                let names: Vec<String> = stmt
                    .column_names()
                    .iter()
                    .map(|name| name.to_string())
                    .collect();
                let mut rows = stmt.query(rusqlite::params_from_iter(params.iter()))?;

                let mut result = vec![];
                while let Some(row) = rows.next()? {
                    let mut record = SqlRow::new();
                    for (index, name) in names.iter().enumerate() {
                        let value: SqlValue = row.get(index)?;
                        record.insert(name.clone(), value);
                    }
                    result.push(record);
                }
                Ok(SqlOutput::Rows(result))
            }
            StatementKind::Insert => {
                conn.execute(&sql, rusqlite::params_from_iter(params.iter()))?;
                Ok(SqlOutput::Inserted(conn.last_insert_rowid()))
            }
            StatementKind::Update | StatementKind::Delete => {
                let affected = conn.execute(&sql, rusqlite::params_from_iter(params.iter()))?;
                Ok(SqlOutput::Affected(affected))
            }
        }
    }

    fn render(&self) -> ShelfResult<(String, Vec<SqlValue>)> {
        match self.kind {
            StatementKind::Select => self.render_select(),
            StatementKind::Insert => self.render_insert(),
            StatementKind::Update => self.render_update(),
            StatementKind::Delete => self.render_delete(),
        }
    }

    fn render_select(&self) -> ShelfResult<(String, Vec<SqlValue>)> {
        let columns = if self.columns.is_empty() {
            "*".to_string()
        } else {
            self.columns.join(", ")
        };
        let mut sql = format!("SELECT {} FROM {}", columns, self.table);
        let mut params = vec![];

        if let Some(expr) = &self.where_expr {
            let (where_sql, where_params) = expr.to_sql()?;
            sql.push_str(" WHERE ");
            sql.push_str(&where_sql);
            params.extend(where_params);
        }
        if let Some((column, order)) = &self.order {
            sql.push_str(&format!(" ORDER BY {} {}", column, order.sql_keyword()));
        }
        match (self.limit, self.offset) {
            (Some(limit), Some(offset)) => {
                sql.push_str(&format!(" LIMIT {} OFFSET {}", limit, offset));
            }
            (Some(limit), None) => sql.push_str(&format!(" LIMIT {}", limit)),
            // OFFSET is only valid after a LIMIT; -1 means unbounded
            (None, Some(offset)) => sql.push_str(&format!(" LIMIT -1 OFFSET {}", offset)),
            (None, None) => {}
        }
        Ok((sql, params))
    }

    fn render_insert(&self) -> ShelfResult<(String, Vec<SqlValue>)> {
        if self.assignments.is_empty() {
            return Err(ShelfError::new(
                "INSERT requires at least one column value",
                ErrorKind::InvalidOperation,
            ));
        }
        let columns: Vec<&str> = self.assignments.iter().map(|(c, _)| c.as_str()).collect();
        let placeholders = vec!["?"; self.assignments.len()].join(", ");
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            self.table,
            columns.join(", "),
            placeholders
        );
        let params = self
            .assignments
            .iter()
            .map(|(_, value)| codec::encode(value))
            .collect::<ShelfResult<Vec<SqlValue>>>()?;
        Ok((sql, params))
    }

    fn render_update(&self) -> ShelfResult<(String, Vec<SqlValue>)> {
        if self.assignments.is_empty() {
            return Err(ShelfError::new(
                "UPDATE requires at least one assignment",
                ErrorKind::InvalidOperation,
            ));
        }
        let set_clause = self
            .assignments
            .iter()
            .map(|(column, _)| format!("{} = ?", column))
            .collect::<Vec<String>>()
            .join(", ");
        let mut sql = format!("UPDATE {} SET {}", self.table, set_clause);
        let mut params = self
            .assignments
            .iter()
            .map(|(_, value)| codec::encode(value))
            .collect::<ShelfResult<Vec<SqlValue>>>()?;

        if let Some(expr) = &self.where_expr {
            let (where_sql, where_params) = expr.to_sql()?;
            sql.push_str(" WHERE ");
            sql.push_str(&where_sql);
            params.extend(where_params);
        }
        Ok((sql, params))
    }

    fn render_delete(&self) -> ShelfResult<(String, Vec<SqlValue>)> {
        let mut sql = format!("DELETE FROM {}", self.table);
        let mut params = vec![];
        if let Some(expr) = &self.where_expr {
            let (where_sql, where_params) = expr.to_sql()?;
            sql.push_str(" WHERE ");
            sql.push_str(&where_sql);
            params.extend(where_params);
        }
        Ok((sql, params))
    }
}
