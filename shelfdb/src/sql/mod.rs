//! The relational layer: schema synthesis, the value codec, the SQL
//! expression compiler, and the single-statement builder.
//!
//! [`TableSchema`] infers column types from field defaults and renders the
//! idempotent table-creation statement. [`expr::compile_spec`] turns a
//! backend-neutral [`FilterSpec`](crate::filter::FilterSpec) into a typed
//! [`SqlExpr`] tree, which always renders as parameterized SQL.

pub mod builder;
pub mod codec;
pub mod expr;
pub mod schema;

pub use builder::{SqlBuilder, SqlOutput, SqlRow};
pub use expr::{col, compile_spec, BinaryOp, MatchShape, SqlCol, SqlExpr};
pub use schema::{ColumnType, FieldDef, TableSchema};
