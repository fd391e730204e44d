use rusqlite::types::Value as SqlValue;
use std::fmt::{Display, Formatter};

use crate::common::Value;
use crate::errors::{ErrorKind, ShelfError, ShelfResult};
use crate::filter::{CompareOp, FilterSpec, Predicate};
use crate::sql::codec;

/// A binary comparison operator of the SQL dialect.
///
/// `Neq` renders as SQLite's `IS NOT`, which - unlike `!=` - is satisfied
/// by NULL operands, keeping "a null field differs from any non-null
/// value" true in the relational backend as well.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Eq,
    Neq,
    Lt,
    Lte,
    Gt,
    Gte,
}

impl BinaryOp {
    fn symbol(&self) -> &'static str {
        match self {
            BinaryOp::Eq => "=",
            BinaryOp::Neq => "IS NOT",
            BinaryOp::Lt => "<",
            BinaryOp::Lte => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Gte => ">=",
        }
    }
}

/// The wildcard shape of a LIKE pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchShape {
    /// `%needle%`
    Contains,
    /// `needle%`
    Prefix,
    /// `%needle`
    Suffix,
}

/// A node of the compiled boolean-expression tree rendered into a WHERE
/// clause.
///
/// A node is either a column reference, a literal, a binary comparison, a
/// containment or pattern test, a null check, or the AND combinator
/// joining two nodes. Trees are built fluently - usually starting from
/// [`col`] - and rendered exactly once by [`SqlExpr::to_sql`], which
/// always emits `?`-parameterized SQL; comparison values never appear in
/// the statement text.
///
/// # Examples
///
/// ```rust,ignore
/// use shelfdb::sql::col;
///
/// let expr = col("score").gt(20i64).and(col("title").icontains("alp"));
/// let (sql, params) = expr.to_sql()?;
/// assert_eq!(sql, "(score > ? AND LOWER(title) LIKE ? ESCAPE '\\')");
/// ```
#[derive(Clone, Debug)]
pub enum SqlExpr {
    /// A column reference.
    Column(String),
    /// A literal comparison value, rendered as a `?` parameter.
    Literal(Value),
    /// A binary comparison between two nodes.
    Binary {
        op: BinaryOp,
        left: Box<SqlExpr>,
        right: Box<SqlExpr>,
    },
    /// A containment or pattern test rendered as a LIKE clause.
    Like {
        column: String,
        needle: String,
        shape: MatchShape,
        case_insensitive: bool,
    },
    /// A set-membership clause (`IN` / `NOT IN`).
    InList {
        column: String,
        values: Vec<Value>,
        negated: bool,
    },
    /// An `IS [NOT] NULL` check.
    NullCheck { column: String, negated: bool },
    /// The boolean AND combinator.
    And(Box<SqlExpr>, Box<SqlExpr>),
}

/// Starts a fluent expression on a column.
pub fn col(name: &str) -> SqlCol {
    SqlCol {
        name: name.to_string(),
    }
}

/// Fluent builder for expressions rooted at a single column.
pub struct SqlCol {
    name: String,
}

impl SqlCol {
    fn binary<V: Into<Value>>(self, op: BinaryOp, value: V) -> SqlExpr {
        SqlExpr::Binary {
            op,
            left: Box::new(SqlExpr::Column(self.name)),
            right: Box::new(SqlExpr::Literal(value.into())),
        }
    }

    pub fn eq<V: Into<Value>>(self, value: V) -> SqlExpr {
        self.binary(BinaryOp::Eq, value)
    }

    pub fn neq<V: Into<Value>>(self, value: V) -> SqlExpr {
        self.binary(BinaryOp::Neq, value)
    }

    pub fn lt<V: Into<Value>>(self, value: V) -> SqlExpr {
        self.binary(BinaryOp::Lt, value)
    }

    pub fn lte<V: Into<Value>>(self, value: V) -> SqlExpr {
        self.binary(BinaryOp::Lte, value)
    }

    pub fn gt<V: Into<Value>>(self, value: V) -> SqlExpr {
        self.binary(BinaryOp::Gt, value)
    }

    pub fn gte<V: Into<Value>>(self, value: V) -> SqlExpr {
        self.binary(BinaryOp::Gte, value)
    }

    pub fn contains(self, needle: &str) -> SqlExpr {
        SqlExpr::Like {
            column: self.name,
            needle: needle.to_string(),
            shape: MatchShape::Contains,
            case_insensitive: false,
        }
    }

    pub fn icontains(self, needle: &str) -> SqlExpr {
        SqlExpr::Like {
            column: self.name,
            needle: needle.to_string(),
            shape: MatchShape::Contains,
            case_insensitive: true,
        }
    }

    pub fn starts_with(self, needle: &str) -> SqlExpr {
        SqlExpr::Like {
            column: self.name,
            needle: needle.to_string(),
            shape: MatchShape::Prefix,
            case_insensitive: false,
        }
    }

    pub fn istarts_with(self, needle: &str) -> SqlExpr {
        SqlExpr::Like {
            column: self.name,
            needle: needle.to_string(),
            shape: MatchShape::Prefix,
            case_insensitive: true,
        }
    }

    pub fn ends_with(self, needle: &str) -> SqlExpr {
        SqlExpr::Like {
            column: self.name,
            needle: needle.to_string(),
            shape: MatchShape::Suffix,
            case_insensitive: false,
        }
    }

    pub fn iends_with(self, needle: &str) -> SqlExpr {
        SqlExpr::Like {
            column: self.name,
            needle: needle.to_string(),
            shape: MatchShape::Suffix,
            case_insensitive: true,
        }
    }

    pub fn one_of(self, values: Vec<Value>) -> SqlExpr {
        SqlExpr::InList {
            column: self.name,
            values,
            negated: false,
        }
    }

    pub fn not_one_of(self, values: Vec<Value>) -> SqlExpr {
        SqlExpr::InList {
            column: self.name,
            values,
            negated: true,
        }
    }

    pub fn is_null(self) -> SqlExpr {
        SqlExpr::NullCheck {
            column: self.name,
            negated: false,
        }
    }

    pub fn is_not_null(self) -> SqlExpr {
        SqlExpr::NullCheck {
            column: self.name,
            negated: true,
        }
    }
}

impl SqlExpr {
    /// Joins two expression nodes with the AND combinator.
    pub fn and(self, other: SqlExpr) -> SqlExpr {
        SqlExpr::And(Box::new(self), Box::new(other))
    }

    /// Renders this expression tree into parameterized SQL text.
    ///
    /// Returns the SQL fragment and the parameter values bound to its `?`
    /// placeholders, in order.
    pub fn to_sql(&self) -> ShelfResult<(String, Vec<SqlValue>)> {
        let mut sql = String::new();
        let mut params = vec![];
        self.render(&mut sql, &mut params)?;
        Ok((sql, params))
    }

    fn render(&self, sql: &mut String, params: &mut Vec<SqlValue>) -> ShelfResult<()> {
        match self {
            SqlExpr::Column(name) => {
                check_ident(name)?;
                sql.push_str(name);
            }
            SqlExpr::Literal(value) => {
                sql.push('?');
                params.push(codec::encode(value)?);
            }
            SqlExpr::Binary { op, left, right } => {
                left.render(sql, params)?;
                sql.push(' ');
                sql.push_str(op.symbol());
                sql.push(' ');
                right.render(sql, params)?;
            }
            SqlExpr::Like {
                column,
                needle,
                shape,
                case_insensitive,
            } => {
                check_ident(column)?;
                let needle = if *case_insensitive {
                    needle.to_lowercase()
                } else {
                    needle.clone()
                };
                let escaped = escape_like(&needle);
                let pattern = match shape {
                    MatchShape::Contains => format!("%{}%", escaped),
                    MatchShape::Prefix => format!("{}%", escaped),
                    MatchShape::Suffix => format!("%{}", escaped),
                };
                if *case_insensitive {
                    sql.push_str(&format!("LOWER({}) LIKE ? ESCAPE '\\'", column));
                } else {
                    sql.push_str(&format!("{} LIKE ? ESCAPE '\\'", column));
                }
                params.push(SqlValue::Text(pattern));
            }
            SqlExpr::InList {
                column,
                values,
                negated,
            } => {
                check_ident(column)?;
                if values.is_empty() {
                    // IN () is a syntax error; an empty list matches
                    // nothing, and its negation matches everything
                    sql.push_str(if *negated { "1 = 1" } else { "1 = 0" });
                    return Ok(());
                }
                let placeholders = vec!["?"; values.len()].join(", ");
                if *negated {
                    // NULL never satisfies NOT IN; absent values must
                    // still count as "not a member"
                    sql.push_str(&format!(
                        "({} NOT IN ({}) OR {} IS NULL)",
                        column, placeholders, column
                    ));
                } else {
                    sql.push_str(&format!("{} IN ({})", column, placeholders));
                }
                for value in values {
                    params.push(codec::encode(value)?);
                }
            }
            SqlExpr::NullCheck { column, negated } => {
                check_ident(column)?;
                sql.push_str(column);
                sql.push_str(if *negated { " IS NOT NULL" } else { " IS NULL" });
            }
            SqlExpr::And(left, right) => {
                sql.push('(');
                left.render(sql, params)?;
                sql.push_str(" AND ");
                right.render(sql, params)?;
                sql.push(')');
            }
        }
        Ok(())
    }
}

impl Display for SqlExpr {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.to_sql() {
            Ok((sql, _)) => write!(f, "{}", sql),
            Err(_) => write!(f, "<invalid expression>"),
        }
    }
}

/// Compiles a filter specification into a WHERE expression tree.
///
/// Multiple predicates combine via AND by left-folding the individual
/// expression nodes; an empty specification compiles to no WHERE clause at
/// all.
pub fn compile_spec(spec: &FilterSpec) -> ShelfResult<Option<SqlExpr>> {
    let mut combined: Option<SqlExpr> = None;
    for predicate in spec.predicates() {
        let node = compile_predicate(predicate)?;
        combined = Some(match combined {
            Some(expr) => expr.and(node),
            None => node,
        });
    }
    Ok(combined)
}

fn compile_predicate(predicate: &Predicate) -> ShelfResult<SqlExpr> {
    let column = col(&predicate.field);
    let value = predicate.value.clone();

    match predicate.op {
        CompareOp::Eq => {
            if value.is_null() {
                Ok(column.is_null())
            } else {
                Ok(column.eq(value))
            }
        }
        CompareOp::Neq => {
            if value.is_null() {
                Ok(column.is_not_null())
            } else {
                Ok(column.neq(value))
            }
        }
        CompareOp::Lt => Ok(column.lt(value)),
        CompareOp::Lte => Ok(column.lte(value)),
        CompareOp::Gt => Ok(column.gt(value)),
        CompareOp::Gte => Ok(column.gte(value)),
        CompareOp::In => Ok(column.one_of(membership_values(predicate)?)),
        CompareOp::NotIn => Ok(column.not_one_of(membership_values(predicate)?)),
        CompareOp::Contains => Ok(column.contains(&loose_needle(predicate)?)),
        CompareOp::IContains => Ok(column.icontains(&strict_needle(predicate)?)),
        CompareOp::StartsWith => Ok(column.starts_with(&loose_needle(predicate)?)),
        CompareOp::IStartsWith => Ok(column.istarts_with(&strict_needle(predicate)?)),
        CompareOp::EndsWith => Ok(column.ends_with(&loose_needle(predicate)?)),
        CompareOp::IEndsWith => Ok(column.iends_with(&strict_needle(predicate)?)),
        CompareOp::IsNull => match &predicate.value {
            Value::Bool(true) | Value::Null => Ok(column.is_null()),
            Value::Bool(false) => Ok(column.is_not_null()),
            other => {
                log::error!(
                    "isnull operator requires a boolean comparison value, got: {}",
                    other
                );
                Err(ShelfError::new(
                    "isnull operator requires a boolean comparison value",
                    ErrorKind::FilterError,
                ))
            }
        },
    }
}

fn membership_values(predicate: &Predicate) -> ShelfResult<Vec<Value>> {
    match predicate.value.as_list() {
        Some(items) => Ok(items.to_vec()),
        None => {
            log::error!(
                "Membership operator requires a list comparison value, got: {}",
                predicate.value
            );
            Err(ShelfError::new(
                "Membership operator requires a list comparison value",
                ErrorKind::FilterError,
            ))
        }
    }
}

/// Pattern needle for the case-sensitive operators. Numeric values render
/// through their text form, which is how a containment test reaches into
/// JSON-encoded list columns.
fn loose_needle(predicate: &Predicate) -> ShelfResult<String> {
    match &predicate.value {
        Value::Int(i) => Ok(i.to_string()),
        Value::Float(f) => Ok(f.to_string()),
        other => other.text_form().ok_or_else(|| {
            ShelfError::new(
                "Pattern operator requires a text comparison value",
                ErrorKind::FilterError,
            )
        }),
    }
}

/// Pattern needle for the case-insensitive operators, which lower-case
/// both sides and therefore only accept text.
fn strict_needle(predicate: &Predicate) -> ShelfResult<String> {
    predicate.value.text_form().ok_or_else(|| {
        log::error!(
            "Pattern operator {} requires a text comparison value, got: {}",
            predicate.op,
            predicate.value
        );
        ShelfError::new(
            "Pattern operator requires a text comparison value",
            ErrorKind::FilterError,
        )
    })
}

fn check_ident(name: &str) -> ShelfResult<()> {
    let mut chars = name.chars();
    let valid_start = chars
        .next()
        .map_or(false, |c| c.is_ascii_alphabetic() || c == '_');
    if valid_start && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        Ok(())
    } else {
        log::error!("Invalid SQL identifier: {}", name);
        Err(ShelfError::new(
            &format!("Invalid SQL identifier: {}", name),
            ErrorKind::FilterError,
        ))
    }
}

/// Escapes LIKE wildcards in a needle so it matches literally.
fn escape_like(needle: &str) -> String {
    needle
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::field;

    #[test]
    fn test_eq_renders_parameterized_comparison() {
        let (sql, params) = col("title").eq("Alpha").to_sql().unwrap();
        assert_eq!(sql, "title = ?");
        assert_eq!(params, vec![SqlValue::Text("Alpha".into())]);
    }

    #[test]
    fn test_neq_renders_null_tolerant_operator() {
        let (sql, _) = col("title").neq("Alpha").to_sql().unwrap();
        assert_eq!(sql, "title IS NOT ?");
    }

    #[test]
    fn test_ordering_operators_render_symbols() {
        assert_eq!(col("score").lt(1i64).to_sql().unwrap().0, "score < ?");
        assert_eq!(col("score").lte(1i64).to_sql().unwrap().0, "score <= ?");
        assert_eq!(col("score").gt(1i64).to_sql().unwrap().0, "score > ?");
        assert_eq!(col("score").gte(1i64).to_sql().unwrap().0, "score >= ?");
    }

    #[test]
    fn test_contains_renders_like_with_wildcards() {
        let (sql, params) = col("title").contains("Knight").to_sql().unwrap();
        assert_eq!(sql, "title LIKE ? ESCAPE '\\'");
        assert_eq!(params, vec![SqlValue::Text("%Knight%".into())]);
    }

    #[test]
    fn test_icontains_lowercases_both_sides() {
        let (sql, params) = col("title").icontains("ALP").to_sql().unwrap();
        assert_eq!(sql, "LOWER(title) LIKE ? ESCAPE '\\'");
        assert_eq!(params, vec![SqlValue::Text("%alp%".into())]);
    }

    #[test]
    fn test_prefix_and_suffix_patterns() {
        let (_, params) = col("title").starts_with("Ho").to_sql().unwrap();
        assert_eq!(params, vec![SqlValue::Text("Ho%".into())]);

        let (_, params) = col("title").ends_with("ght").to_sql().unwrap();
        assert_eq!(params, vec![SqlValue::Text("%ght".into())]);
    }

    #[test]
    fn test_like_needle_wildcards_are_escaped() {
        let (_, params) = col("title").contains("50%_done").to_sql().unwrap();
        assert_eq!(params, vec![SqlValue::Text("%50\\%\\_done%".into())]);
    }

    #[test]
    fn test_in_list_renders_placeholders() {
        let values = vec![Value::from("playing"), Value::from("paused")];
        let (sql, params) = col("status").one_of(values).to_sql().unwrap();
        assert_eq!(sql, "status IN (?, ?)");
        assert_eq!(params.len(), 2);
    }

    #[test]
    fn test_not_in_list_tolerates_null_rows() {
        let values = vec![Value::from("finished")];
        let (sql, _) = col("status").not_one_of(values).to_sql().unwrap();
        assert_eq!(sql, "(status NOT IN (?) OR status IS NULL)");
    }

    #[test]
    fn test_empty_in_list_renders_constant() {
        assert_eq!(col("status").one_of(vec![]).to_sql().unwrap().0, "1 = 0");
        assert_eq!(col("status").not_one_of(vec![]).to_sql().unwrap().0, "1 = 1");
    }

    #[test]
    fn test_null_checks() {
        assert_eq!(col("deleted_at").is_null().to_sql().unwrap().0, "deleted_at IS NULL");
        assert_eq!(
            col("deleted_at").is_not_null().to_sql().unwrap().0,
            "deleted_at IS NOT NULL"
        );
    }

    #[test]
    fn test_and_left_fold() {
        let expr = col("a").eq(1i64).and(col("b").eq(2i64)).and(col("c").eq(3i64));
        let (sql, params) = expr.to_sql().unwrap();
        assert_eq!(sql, "((a = ? AND b = ?) AND c = ?)");
        assert_eq!(params.len(), 3);
    }

    #[test]
    fn test_invalid_identifier_is_rejected() {
        let result = col("title; DROP TABLE games").eq("x").to_sql();
        assert!(result.is_err());
        assert_eq!(result.unwrap_err().kind(), &ErrorKind::FilterError);
    }

    #[test]
    fn test_values_never_appear_in_sql_text() {
        let (sql, _) = col("title").eq("Robert'); DROP TABLE games;--").to_sql().unwrap();
        assert!(!sql.contains("DROP"));
        assert_eq!(sql, "title = ?");
    }

    #[test]
    fn test_compile_spec_empty_is_no_where_clause() {
        assert!(compile_spec(&FilterSpec::new()).unwrap().is_none());
    }

    #[test]
    fn test_compile_spec_left_folds_predicates() {
        let spec = FilterSpec::new()
            .with(field("score").gt(20i64))
            .with(field("status").eq("playing"));
        let expr = compile_spec(&spec).unwrap().unwrap();
        let (sql, params) = expr.to_sql().unwrap();
        assert_eq!(sql, "(score > ? AND status = ?)");
        assert_eq!(params.len(), 2);
    }

    #[test]
    fn test_compile_eq_null_renders_is_null() {
        let spec = FilterSpec::new().with(field("score").eq(Value::Null));
        let expr = compile_spec(&spec).unwrap().unwrap();
        assert_eq!(expr.to_sql().unwrap().0, "score IS NULL");

        let spec = FilterSpec::new().with(field("score").neq(Value::Null));
        let expr = compile_spec(&spec).unwrap().unwrap();
        assert_eq!(expr.to_sql().unwrap().0, "score IS NOT NULL");
    }

    #[test]
    fn test_compile_is_null_flag() {
        let spec = FilterSpec::new().with(field("deleted_at").is_null(true));
        let expr = compile_spec(&spec).unwrap().unwrap();
        assert_eq!(expr.to_sql().unwrap().0, "deleted_at IS NULL");

        let spec = FilterSpec::new().with(field("deleted_at").is_null(false));
        let expr = compile_spec(&spec).unwrap().unwrap();
        assert_eq!(expr.to_sql().unwrap().0, "deleted_at IS NOT NULL");
    }

    #[test]
    fn test_compile_datetime_value_binds_iso_text() {
        use chrono::TimeZone;
        let ts = chrono::Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let spec = FilterSpec::new().with(field("release_date").lt(ts));
        let expr = compile_spec(&spec).unwrap().unwrap();
        let (_, params) = expr.to_sql().unwrap();
        assert_eq!(
            params,
            vec![SqlValue::Text("2024-01-01T00:00:00.000000Z".into())]
        );
    }

    #[test]
    fn test_compile_membership_requires_list() {
        let spec = FilterSpec::new().with(Predicate::new("score", CompareOp::In, 10i64));
        let result = compile_spec(&spec);
        assert!(result.is_err());
        assert_eq!(result.unwrap_err().kind(), &ErrorKind::FilterError);
    }
}
