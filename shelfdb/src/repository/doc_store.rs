use chrono::Utc;
use parking_lot::RwLock;
use serde_json::Value as JsonValue;
use std::sync::Arc;

use crate::common::{Record, Value, FIELD_DELETED_AT, FIELD_ID};
use crate::docstore::{compile, Condition, DocStore, JsonMap, Table};
use crate::errors::{ErrorKind, ShelfError, ShelfResult};
use crate::filter::{evaluator, FilterSpec};
use crate::repository::{
    paginate, sanitize_patch, stamp_new, FindOptions, Page, RecordId, Repository,
};

/// The document-store backend.
///
/// Records are stored as plain JSON documents in one table of a
/// [`DocStore`]. Queries compile the filter specification into the
/// store's native [`Condition`] primitives; when compilation fails with a
/// recognized compiler error (`UnsupportedOperator`, `FilterError`,
/// `SerializationError` - and only those), the backend degrades to a full
/// table scan re-checked by the in-memory evaluator, logging the
/// discrepancy instead of failing the call. Any other error propagates.
#[derive(Clone)]
pub struct DocStoreRepository {
    inner: Arc<DocInner>,
}

struct DocInner {
    table: Table,
    next_id: RwLock<RecordId>,
}

impl DocStoreRepository {
    /// Opens a repository over one table of a document store, seeding the
    /// id counter from the stored documents.
    pub fn open(store: &DocStore, table_name: &str) -> ShelfResult<DocStoreRepository> {
        let table = store.table(table_name);
        let max_id = table
            .all()?
            .iter()
            .filter_map(|doc| doc.get(FIELD_ID).and_then(JsonValue::as_i64))
            .max()
            .unwrap_or(0);

        log::debug!(
            "Opened document-store repository for table {} (next id {})",
            table_name,
            max_id + 1
        );
        Ok(DocStoreRepository {
            inner: Arc::new(DocInner {
                table,
                next_id: RwLock::new(max_id + 1),
            }),
        })
    }

    fn id_condition(id: RecordId) -> Condition {
        Condition::Eq(FIELD_ID.to_string(), JsonValue::from(id))
    }

    fn decode(doc: &JsonMap) -> ShelfResult<Record> {
        Record::from_json(&JsonValue::Object(doc.clone()))
    }

    fn decode_all(docs: &[JsonMap]) -> ShelfResult<Vec<Record>> {
        docs.iter().map(Self::decode).collect()
    }

    fn record_to_doc(record: &Record) -> ShelfResult<JsonMap> {
        match record.to_json() {
            JsonValue::Object(map) => Ok(map),
            _ => Err(ShelfError::new(
                "Record did not serialize to a JSON object",
                ErrorKind::SerializationError,
            )),
        }
    }

    /// Two-stage query execution: native compilation first, evaluator
    /// fallback on recognized compiler failures only.
    fn filter_records(&self, spec: &FilterSpec) -> ShelfResult<Vec<Record>> {
        match compile(spec) {
            Ok(condition) => Self::decode_all(&self.inner.table.search(&condition)?),
            Err(err)
                if matches!(
                    err.kind(),
                    ErrorKind::UnsupportedOperator
                        | ErrorKind::FilterError
                        | ErrorKind::SerializationError
                ) =>
            {
                log::warn!(
                    "Native query compilation failed ({}), falling back to full-scan evaluation",
                    err
                );
                let mut matched = vec![];
                for record in Self::decode_all(&self.inner.table.all()?)? {
                    if evaluator::matches(&record, spec)? {
                        matched.push(record);
                    }
                }
                Ok(matched)
            }
            Err(err) => Err(err),
        }
    }
}

impl Repository for DocStoreRepository {
    fn create(&self, record: &Record) -> ShelfResult<Record> {
        let mut stamped = stamp_new(record)?;
        let mut next_id = self.inner.next_id.write();
        stamped.set_id(*next_id);
        self.inner.table.insert(Self::record_to_doc(&stamped)?)?;
        *next_id += 1;
        log::debug!("Created document: {}", stamped);
        // read back through the codec so the caller sees exactly what a
        // later fetch would return
        Self::decode(&Self::record_to_doc(&stamped)?)
    }

    fn update(&self, id: RecordId, patch: &Record) -> ShelfResult<Record> {
        let condition = Self::id_condition(id);
        if self.inner.table.search(&condition)?.is_empty() {
            log::error!("Cannot update: document with id {} not found", id);
            return Err(ShelfError::new(
                &format!("Record with id {} not found", id),
                ErrorKind::NotFound,
            ));
        }

        let patch_doc = Self::record_to_doc(&sanitize_patch(patch))?;
        self.inner.table.update_where(&patch_doc, &condition)?;

        let updated = self.inner.table.search(&condition)?;
        let record = Self::decode(&updated[0])?;
        log::debug!("Updated document: {}", record);
        Ok(record)
    }

    fn delete(&self, id: RecordId, soft: bool) -> ShelfResult<bool> {
        let condition = Self::id_condition(id);
        if self.inner.table.search(&condition)?.is_empty() {
            log::debug!("Cannot delete: document with id {} not found", id);
            return Ok(false);
        }

        if soft {
            let marker = Record::new().with(FIELD_DELETED_AT, Utc::now());
            self.inner
                .table
                .update_where(&Self::record_to_doc(&marker)?, &condition)?;
        } else {
            self.inner.table.remove_where(&condition)?;
        }
        Ok(true)
    }

    fn get_by_id(&self, id: RecordId) -> ShelfResult<Option<Record>> {
        let hits = self.inner.table.search(&Self::id_condition(id))?;
        match hits.first() {
            Some(doc) => Ok(Some(Self::decode(doc)?)),
            None => Ok(None),
        }
    }

    fn get_many_by_ids(&self, ids: &[RecordId]) -> ShelfResult<Vec<Record>> {
        let wanted = ids.iter().map(|id| JsonValue::from(*id)).collect();
        let condition = Condition::OneOf(FIELD_ID.to_string(), wanted);
        Self::decode_all(&self.inner.table.search(&condition)?)
    }

    fn list_all(&self) -> ShelfResult<Vec<Record>> {
        Self::decode_all(&self.inner.table.all()?)
    }

    fn exists(&self, spec: &FilterSpec) -> ShelfResult<bool> {
        Ok(!self.filter_records(spec)?.is_empty())
    }

    fn count(&self, spec: &FilterSpec) -> ShelfResult<usize> {
        Ok(self.filter_records(spec)?.len())
    }

    fn filter(&self, spec: &FilterSpec, options: &FindOptions) -> ShelfResult<Page> {
        log::debug!(
            "Filtering table {} with: {}",
            self.inner.table.name(),
            spec
        );
        let matched = self.filter_records(spec)?;
        Ok(paginate(matched, options))
    }

    fn atomic(&self, work: &mut dyn FnMut() -> ShelfResult<()>) -> ShelfResult<()> {
        // snapshot the whole table; restore is truncate + re-insert, an
        // O(n) operation that is not isolated from concurrent readers
        let snapshot = self.inner.table.all()?;
        let next_id_snapshot = *self.inner.next_id.read();

        match work() {
            Ok(()) => Ok(()),
            Err(err) => {
                log::warn!(
                    "Atomic scope failed, restoring {} documents: {}",
                    snapshot.len(),
                    err
                );
                self.inner.table.truncate()?;
                self.inner.table.insert_all(snapshot)?;
                *self.inner.next_id.write() = next_id_snapshot;
                Err(err)
            }
        }
    }
}
