use chrono::Utc;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::common::{Record, Value, FIELD_DELETED_AT};
use crate::errors::{ErrorKind, ShelfError, ShelfResult};
use crate::filter::{evaluator, FilterSpec};
use crate::repository::{
    paginate, sanitize_patch, stamp_new, FindOptions, Page, RecordId, Repository,
};

/// The in-memory backend: records live in an id-keyed map.
///
/// `filter` applies the in-memory evaluator to every record in map
/// iteration order (which is id order), then runs the shared pagination
/// pipeline. The id counter is owned by this instance alone - clones share
/// state through `Arc`, but separate instances never do.
///
/// # Examples
///
/// ```rust,ignore
/// use shelfdb::repository::{MemoryRepository, Repository};
/// use shelfdb::common::Record;
///
/// let repo = MemoryRepository::new();
/// let created = repo.create(&Record::new().with("title", "Alpha"))?;
/// assert_eq!(created.id(), Some(1));
/// ```
#[derive(Clone)]
pub struct MemoryRepository {
    inner: Arc<MemoryInner>,
}

struct MemoryInner {
    records: RwLock<BTreeMap<RecordId, Record>>,
    next_id: RwLock<RecordId>,
}

impl MemoryRepository {
    /// Creates an empty in-memory repository.
    pub fn new() -> MemoryRepository {
        MemoryRepository {
            inner: Arc::new(MemoryInner {
                records: RwLock::new(BTreeMap::new()),
                next_id: RwLock::new(1),
            }),
        }
    }
}

impl Default for MemoryRepository {
    fn default() -> Self {
        MemoryRepository::new()
    }
}

impl Repository for MemoryRepository {
    fn create(&self, record: &Record) -> ShelfResult<Record> {
        let mut stamped = stamp_new(record)?;
        let mut next_id = self.inner.next_id.write();
        stamped.set_id(*next_id);
        self.inner.records.write().insert(*next_id, stamped.clone());
        *next_id += 1;
        log::debug!("Created record: {}", stamped);
        Ok(stamped)
    }

    fn update(&self, id: RecordId, patch: &Record) -> ShelfResult<Record> {
        let mut records = self.inner.records.write();
        let existing = records.get_mut(&id).ok_or_else(|| {
            log::error!("Cannot update: record with id {} not found", id);
            ShelfError::new(
                &format!("Record with id {} not found", id),
                ErrorKind::NotFound,
            )
        })?;
        existing.merge(&sanitize_patch(patch));
        log::debug!("Updated record: {}", existing);
        Ok(existing.clone())
    }

    fn delete(&self, id: RecordId, soft: bool) -> ShelfResult<bool> {
        let mut records = self.inner.records.write();
        match records.get_mut(&id) {
            Some(record) if soft => {
                record.put(FIELD_DELETED_AT, Utc::now());
                Ok(true)
            }
            Some(_) => {
                records.remove(&id);
                Ok(true)
            }
            None => {
                log::debug!("Cannot delete: record with id {} not found", id);
                Ok(false)
            }
        }
    }

    fn get_by_id(&self, id: RecordId) -> ShelfResult<Option<Record>> {
        Ok(self.inner.records.read().get(&id).cloned())
    }

    fn get_many_by_ids(&self, ids: &[RecordId]) -> ShelfResult<Vec<Record>> {
        let records = self.inner.records.read();
        Ok(ids
            .iter()
            .filter_map(|id| records.get(id).cloned())
            .collect())
    }

    fn list_all(&self) -> ShelfResult<Vec<Record>> {
        Ok(self.inner.records.read().values().cloned().collect())
    }

    fn exists(&self, spec: &FilterSpec) -> ShelfResult<bool> {
        let records = self.inner.records.read();
        for record in records.values() {
            if evaluator::matches(record, spec)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn count(&self, spec: &FilterSpec) -> ShelfResult<usize> {
        let records = self.inner.records.read();
        let mut count = 0;
        for record in records.values() {
            if evaluator::matches(record, spec)? {
                count += 1;
            }
        }
        Ok(count)
    }

    fn filter(&self, spec: &FilterSpec, options: &FindOptions) -> ShelfResult<Page> {
        log::debug!("Filtering in-memory records with: {}", spec);
        let records = self.inner.records.read();
        let mut matched = vec![];
        for record in records.values() {
            if evaluator::matches(record, spec)? {
                matched.push(record.clone());
            }
        }
        drop(records);
        Ok(paginate(matched, options))
    }

    fn atomic(&self, work: &mut dyn FnMut() -> ShelfResult<()>) -> ShelfResult<()> {
        let snapshot = self.inner.records.read().clone();
        let next_id_snapshot = *self.inner.next_id.read();

        match work() {
            Ok(()) => Ok(()),
            Err(err) => {
                log::warn!("Atomic scope failed, restoring snapshot: {}", err);
                *self.inner.records.write() = snapshot;
                *self.inner.next_id.write() = next_id_snapshot;
                Err(err)
            }
        }
    }
}
