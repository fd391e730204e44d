//! The uniform repository contract and its four backends.
//!
//! Every backend exposes the same CRUD/filter/pagination surface over
//! [`Record`]s and must produce semantically identical results for the
//! same specification and the same underlying data - that cross-backend
//! equivalence is the contract's central correctness property, and the
//! shared pagination pipeline in this module is most of how it is kept.

pub mod doc_store;
pub mod localfile;
pub mod memory;
pub mod sqlite;

use chrono::Utc;

use crate::common::{
    Record, SortOrder, Value, FIELD_CREATED_AT, FIELD_DELETED_AT, FIELD_ID, FIELD_UPDATED_AT,
};
use crate::errors::{ErrorKind, ShelfError, ShelfResult};
use crate::filter::FilterSpec;

pub use doc_store::DocStoreRepository;
pub use localfile::FileRepository;
pub use memory::MemoryRepository;
pub use sqlite::SqliteRepository;

/// The backend-assigned record identifier.
pub type RecordId = i64;

/// One page of filtered records.
///
/// `total` counts the records matching the filter before offset/limit are
/// applied. `next_cursor`, when present, is the id of the last returned
/// item and resumes forward-only pagination when passed back through
/// [`FindOptions::cursor`].
#[derive(Clone, Debug, PartialEq)]
pub struct Page {
    pub items: Vec<Record>,
    pub total: usize,
    pub has_next: bool,
    pub next_cursor: Option<RecordId>,
}

/// Options controlling ordering and pagination of a `filter` call.
///
/// Supports method chaining for convenient configuration:
///
/// ```rust,ignore
/// use shelfdb::repository::FindOptions;
/// use shelfdb::common::SortOrder;
///
/// let options = FindOptions::new()
///     .order_by("score", SortOrder::Descending)
///     .limit(20)
///     .offset(10);
/// ```
#[derive(Clone, Debug)]
pub struct FindOptions {
    pub(crate) order_by: Option<String>,
    pub(crate) order: SortOrder,
    pub(crate) limit: Option<usize>,
    pub(crate) offset: Option<usize>,
    pub(crate) cursor: Option<RecordId>,
}

impl FindOptions {
    /// Creates options with no ordering and no pagination.
    pub fn new() -> FindOptions {
        FindOptions {
            order_by: None,
            order: SortOrder::Ascending,
            limit: None,
            offset: None,
            cursor: None,
        }
    }

    /// Orders the result by a field. Records whose field is null or
    /// absent are dropped from the ordered result.
    pub fn order_by(mut self, field: &str, order: SortOrder) -> FindOptions {
        self.order_by = Some(field.to_string());
        self.order = order;
        self
    }

    /// Caps the number of returned records.
    pub fn limit(mut self, limit: usize) -> FindOptions {
        self.limit = Some(limit);
        self
    }

    /// Skips records at the start of the (cursor-adjusted) result.
    pub fn offset(mut self, offset: usize) -> FindOptions {
        self.offset = Some(offset);
        self
    }

    /// Resumes after the record with this id, as returned in
    /// [`Page::next_cursor`].
    pub fn cursor(mut self, cursor: RecordId) -> FindOptions {
        self.cursor = Some(cursor);
        self
    }
}

impl Default for FindOptions {
    fn default() -> Self {
        FindOptions::new()
    }
}

/// The uniform repository contract implemented by all four backends.
///
/// Policy, applied uniformly:
/// - `create` rejects caller-supplied ids and stamps UTC timestamps
/// - `update` on a missing id fails with `NotFound`
/// - `delete` on a missing id returns `Ok(false)`, never an error
/// - `get_by_id` on a missing id returns `Ok(None)`, never an error
/// - soft-deleted records stay visible unless filtered on `deleted_at`
///
/// `atomic` is a scoped unit of work: if the closure fails, persisted
/// state is restored to what it was before the scope. How strong that
/// guarantee is varies per backend (map snapshot, directory rewrite,
/// table snapshot, or a native transaction).
pub trait Repository {
    /// Persists a new record, assigning its id and timestamps.
    fn create(&self, record: &Record) -> ShelfResult<Record>;

    /// Merges a patch onto an existing record and bumps `updated_at`.
    fn update(&self, id: RecordId, patch: &Record) -> ShelfResult<Record>;

    /// Deletes a record; `soft` marks `deleted_at` instead of removing.
    fn delete(&self, id: RecordId, soft: bool) -> ShelfResult<bool>;

    /// Fetches a record by id.
    fn get_by_id(&self, id: RecordId) -> ShelfResult<Option<Record>>;

    /// Fetches several records by id; result order is unspecified.
    fn get_many_by_ids(&self, ids: &[RecordId]) -> ShelfResult<Vec<Record>>;

    /// Every stored record.
    fn list_all(&self) -> ShelfResult<Vec<Record>>;

    /// Whether any record matches the specification.
    fn exists(&self, spec: &FilterSpec) -> ShelfResult<bool>;

    /// How many records match the specification.
    fn count(&self, spec: &FilterSpec) -> ShelfResult<usize>;

    /// Matches, orders, and paginates records.
    fn filter(&self, spec: &FilterSpec, options: &FindOptions) -> ShelfResult<Page>;

    /// Runs a scoped unit of work, rolling persisted state back if the
    /// closure fails.
    fn atomic(&self, work: &mut dyn FnMut() -> ShelfResult<()>) -> ShelfResult<()>;
}

/// Stamps a caller-supplied record for creation: rejects a preset id and
/// overwrites the reserved timestamp fields - those are backend-owned and
/// never trusted from input.
pub(crate) fn stamp_new(record: &Record) -> ShelfResult<Record> {
    if record.id().is_some() {
        log::error!("Refusing to create a record with a caller-supplied id");
        return Err(ShelfError::new(
            "Records must be created without an id; the backend assigns one",
            ErrorKind::InvalidId,
        ));
    }
    let now = Utc::now();
    let mut stamped = record.clone();
    stamped.remove(FIELD_ID);
    stamped.put(FIELD_CREATED_AT, now);
    stamped.put(FIELD_UPDATED_AT, now);
    stamped.put(FIELD_DELETED_AT, Value::Null);
    Ok(stamped)
}

/// Normalizes an update patch: the id and creation timestamp are
/// immutable, and `updated_at` is bumped to now.
pub(crate) fn sanitize_patch(patch: &Record) -> Record {
    let mut sanitized = patch.clone();
    sanitized.remove(FIELD_ID);
    sanitized.remove(FIELD_CREATED_AT);
    sanitized.put(FIELD_UPDATED_AT, Utc::now());
    sanitized
}

/// The shared ordering + pagination pipeline.
///
/// Ordering drops records whose order field is null or absent, then
/// stable-sorts. The rest is [`paginate_sorted`].
pub(crate) fn paginate(mut items: Vec<Record>, options: &FindOptions) -> Page {
    if let Some(order_field) = &options.order_by {
        items.retain(|record| !record.get(order_field).is_null());
        match options.order {
            SortOrder::Ascending => {
                items.sort_by(|a, b| a.get(order_field).cmp(&b.get(order_field)))
            }
            SortOrder::Descending => {
                items.sort_by(|a, b| b.get(order_field).cmp(&a.get(order_field)))
            }
        }
    }
    paginate_sorted(items, options)
}

/// Cursor, offset, and limit slicing over an already-ordered result.
///
/// The cursor locates the record with the given id and keeps the strict
/// suffix after it; an unknown cursor id yields an empty page. `total` is
/// counted after the cursor cut and before offset/limit. `next_cursor` is
/// the id of the last returned item, set only when more items remain.
pub(crate) fn paginate_sorted(mut items: Vec<Record>, options: &FindOptions) -> Page {
    if let Some(cursor) = options.cursor {
        match items.iter().position(|record| record.id() == Some(cursor)) {
            Some(index) => {
                items = items.split_off(index + 1);
            }
            None => items.clear(),
        }
    }

    let total = items.len();

    if let Some(offset) = options.offset {
        if offset >= items.len() {
            items.clear();
        } else {
            items = items.split_off(offset);
        }
    }

    let mut has_next = false;
    let mut next_cursor = None;
    if let Some(limit) = options.limit {
        has_next = items.len() > limit;
        items.truncate(limit);
        if has_next {
            next_cursor = items.last().and_then(Record::id);
        }
    }

    Page {
        items,
        total,
        has_next,
        next_cursor,
    }
}
