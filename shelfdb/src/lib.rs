//! # shelfdb - an embedded record store with pluggable backends
//!
//! shelfdb persists small structured records behind one uniform repository
//! contract while letting the storage engine underneath vary: an in-memory
//! map, one JSON file per record, an embedded document store, or SQLite
//! reached through a hand-built SQL layer.
//!
//! ## Key Features
//!
//! - **Backend-neutral filters**: one declarative [`filter::FilterSpec`]
//!   (field / operator / value predicates, implicit AND) interpreted or
//!   compiled correctly by four structurally different execution
//!   strategies
//! - **Uniform contract**: [`repository::Repository`] - CRUD, existence
//!   and count probes, ordered cursor pagination, and a scoped `atomic`
//!   unit of work, with identical semantics everywhere
//! - **Schema synthesis**: the relational backend infers column types
//!   from field defaults and emits idempotent `CREATE TABLE` statements
//! - **Typed SQL expressions**: filters render as parameterized WHERE
//!   trees - comparison values never appear in statement text
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use shelfdb::common::{Record, SortOrder};
//! use shelfdb::filter::{field, FilterSpec};
//! use shelfdb::repository::{FindOptions, MemoryRepository, Repository};
//!
//! # fn main() -> shelfdb::errors::ShelfResult<()> {
//! let repo = MemoryRepository::new();
//! repo.create(&Record::new().with("title", "Hollow Knight").with("score", 95i64))?;
//! repo.create(&Record::new().with("title", "Celeste").with("score", 92i64))?;
//!
//! let spec = FilterSpec::new().with(field("score").gt(90i64));
//! let page = repo.filter(
//!     &spec,
//!     &FindOptions::new().order_by("score", SortOrder::Descending).limit(10),
//! )?;
//! assert_eq!(page.total, 2);
//! # Ok(())
//! # }
//! ```
//!
//! The same `spec` and `options` run unchanged against
//! [`repository::FileRepository`], [`repository::DocStoreRepository`], and
//! [`repository::SqliteRepository`] - and must select the same records.
//!
//! ## Module Organization
//!
//! - [`common`] - field values, records, sort order, timestamp text
//! - [`errors`] - error types and result definitions
//! - [`filter`] - the filter specification and in-memory evaluator
//! - [`docstore`] - the embedded document store and its query compiler
//! - [`sql`] - schema synthesis, value codec, expression compiler, builder
//! - [`repository`] - the uniform contract and the four backends

pub mod common;
pub mod docstore;
pub mod errors;
pub mod filter;
pub mod repository;
pub mod sql;

pub use common::{Record, SortOrder, Value};
pub use errors::{ErrorKind, ShelfError, ShelfResult};
pub use filter::{field, CompareOp, FilterSpec, Predicate};
pub use repository::{
    DocStoreRepository, FileRepository, FindOptions, MemoryRepository, Page, RecordId, Repository,
    SqliteRepository,
};
