use chrono::Utc;
use parking_lot::RwLock;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::common::{Record, FIELD_DELETED_AT};
use crate::errors::{ErrorKind, ShelfError, ShelfResult};
use crate::filter::{evaluator, FilterSpec};
use crate::repository::{
    paginate, sanitize_patch, stamp_new, FindOptions, Page, RecordId, Repository,
};

/// The per-record-file backend: one JSON document per record.
///
/// Records live at `<base>/<entity>/<id>.json`. The next id is computed
/// once at startup as `max(existing ids) + 1` by scanning the file stems.
/// There is no indexing: every query loads and deserializes every file, so
/// cost is linear in the number of stored records.
///
/// # Examples
///
/// ```rust,ignore
/// use shelfdb::repository::{FileRepository, Repository};
///
/// let repo = FileRepository::open("data", "backlogs")?;
/// let created = repo.create(&Record::new().with("title", "My backlog"))?;
/// // data/backlogs/1.json now exists
/// ```
#[derive(Clone)]
pub struct FileRepository {
    inner: Arc<FileInner>,
}

struct FileInner {
    dir: PathBuf,
    entity: String,
    next_id: RwLock<RecordId>,
}

impl FileRepository {
    /// Opens (and creates if needed) the entity directory under the base
    /// directory, then scans it to seed the id counter.
    pub fn open<P: AsRef<Path>>(base: P, entity: &str) -> ShelfResult<FileRepository> {
        let dir = base.as_ref().join(entity);
        fs::create_dir_all(&dir)?;

        let max_id = Self::scan_max_id(&dir)?;
        log::debug!(
            "Opened file repository for {} at {} (next id {})",
            entity,
            dir.display(),
            max_id + 1
        );
        Ok(FileRepository {
            inner: Arc::new(FileInner {
                dir,
                entity: entity.to_string(),
                next_id: RwLock::new(max_id + 1),
            }),
        })
    }

    /// The entity name this repository stores.
    pub fn entity(&self) -> &str {
        &self.inner.entity
    }

    fn scan_max_id(dir: &Path) -> ShelfResult<RecordId> {
        let mut max_id = 0;
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                if let Ok(id) = stem.parse::<RecordId>() {
                    max_id = max_id.max(id);
                }
            }
        }
        Ok(max_id)
    }

    fn record_path(&self, id: RecordId) -> PathBuf {
        self.inner.dir.join(format!("{}.json", id))
    }

    fn load(&self, id: RecordId) -> ShelfResult<Option<Record>> {
        let path = self.record_path(id);
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&path)?;
        let json: serde_json::Value = serde_json::from_str(&content)?;
        Ok(Some(Record::from_json(&json)?))
    }

    fn save(&self, record: &Record) -> ShelfResult<()> {
        let id = record.id().ok_or_else(|| {
            ShelfError::new(
                "Cannot persist a record without an id",
                ErrorKind::InvalidOperation,
            )
        })?;
        let text = serde_json::to_string_pretty(&record.to_json())?;
        fs::write(self.record_path(id), text)?;
        Ok(())
    }

    /// Loads every stored record, sorted by id so results are stable
    /// across filesystems with different directory orders.
    fn load_all(&self) -> ShelfResult<Vec<Record>> {
        let mut ids = vec![];
        for entry in fs::read_dir(&self.inner.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                if let Ok(id) = stem.parse::<RecordId>() {
                    ids.push(id);
                }
            }
        }
        ids.sort_unstable();

        let mut records = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(record) = self.load(id)? {
                records.push(record);
            }
        }
        Ok(records)
    }
}

impl Repository for FileRepository {
    fn create(&self, record: &Record) -> ShelfResult<Record> {
        let mut stamped = stamp_new(record)?;
        let mut next_id = self.inner.next_id.write();
        stamped.set_id(*next_id);
        self.save(&stamped)?;
        *next_id += 1;
        log::debug!("Created record file: {}", stamped);
        Ok(stamped)
    }

    fn update(&self, id: RecordId, patch: &Record) -> ShelfResult<Record> {
        let mut existing = self.load(id)?.ok_or_else(|| {
            log::error!("Cannot update: record file {}.json not found", id);
            ShelfError::new(
                &format!("Record with id {} not found", id),
                ErrorKind::NotFound,
            )
        })?;
        existing.merge(&sanitize_patch(patch));
        self.save(&existing)?;
        log::debug!("Updated record file: {}", existing);
        Ok(existing)
    }

    fn delete(&self, id: RecordId, soft: bool) -> ShelfResult<bool> {
        match self.load(id)? {
            Some(mut record) if soft => {
                record.put(FIELD_DELETED_AT, Utc::now());
                self.save(&record)?;
                Ok(true)
            }
            Some(_) => {
                fs::remove_file(self.record_path(id))?;
                Ok(true)
            }
            None => {
                log::debug!("Cannot delete: record file {}.json not found", id);
                Ok(false)
            }
        }
    }

    fn get_by_id(&self, id: RecordId) -> ShelfResult<Option<Record>> {
        self.load(id)
    }

    fn get_many_by_ids(&self, ids: &[RecordId]) -> ShelfResult<Vec<Record>> {
        let mut records = vec![];
        for id in ids {
            if let Some(record) = self.load(*id)? {
                records.push(record);
            }
        }
        Ok(records)
    }

    fn list_all(&self) -> ShelfResult<Vec<Record>> {
        self.load_all()
    }

    fn exists(&self, spec: &FilterSpec) -> ShelfResult<bool> {
        for record in self.load_all()? {
            if evaluator::matches(&record, spec)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn count(&self, spec: &FilterSpec) -> ShelfResult<usize> {
        let mut count = 0;
        for record in self.load_all()? {
            if evaluator::matches(&record, spec)? {
                count += 1;
            }
        }
        Ok(count)
    }

    fn filter(&self, spec: &FilterSpec, options: &FindOptions) -> ShelfResult<Page> {
        log::debug!("Filtering {} record files with: {}", self.inner.entity, spec);
        let mut matched = vec![];
        for record in self.load_all()? {
            if evaluator::matches(&record, spec)? {
                matched.push(record);
            }
        }
        Ok(paginate(matched, options))
    }

    fn atomic(&self, work: &mut dyn FnMut() -> ShelfResult<()>) -> ShelfResult<()> {
        let snapshot = self.load_all()?;
        let next_id_snapshot = *self.inner.next_id.read();

        match work() {
            Ok(()) => Ok(()),
            Err(err) => {
                log::warn!(
                    "Atomic scope failed, rewriting {} record files: {}",
                    snapshot.len(),
                    err
                );
                for entry in fs::read_dir(&self.inner.dir)? {
                    let path = entry?.path();
                    if path.extension().and_then(|e| e.to_str()) == Some("json") {
                        fs::remove_file(path)?;
                    }
                }
                for record in &snapshot {
                    self.save(record)?;
                }
                *self.inner.next_id.write() = next_id_snapshot;
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::Value;
    use crate::filter::field;
    use tempfile::tempdir;

    #[test]
    fn test_create_writes_one_file_per_record() {
        let dir = tempdir().unwrap();
        let repo = FileRepository::open(dir.path(), "dummy").unwrap();

        let created = repo.create(&Record::new().with("name", "Test Item")).unwrap();
        assert_eq!(created.id(), Some(1));
        assert!(dir.path().join("dummy/1.json").exists());
    }

    #[test]
    fn test_next_id_resumes_from_existing_files() {
        let dir = tempdir().unwrap();
        {
            let repo = FileRepository::open(dir.path(), "dummy").unwrap();
            repo.create(&Record::new().with("name", "A")).unwrap();
            repo.create(&Record::new().with("name", "B")).unwrap();
        }
        let reopened = FileRepository::open(dir.path(), "dummy").unwrap();
        let created = reopened.create(&Record::new().with("name", "C")).unwrap();
        assert_eq!(created.id(), Some(3));
    }

    #[test]
    fn test_get_by_id_round_trips_through_json() {
        let dir = tempdir().unwrap();
        let repo = FileRepository::open(dir.path(), "dummy").unwrap();
        let created = repo.create(&Record::new().with("name", "Test Item")).unwrap();

        let found = repo.get_by_id(created.id().unwrap()).unwrap().unwrap();
        assert_eq!(found, created);
        assert!(found.created_at().is_some());
    }

    #[test]
    fn test_get_by_id_missing_returns_none() {
        let dir = tempdir().unwrap();
        let repo = FileRepository::open(dir.path(), "dummy").unwrap();
        assert!(repo.get_by_id(99).unwrap().is_none());
    }

    #[test]
    fn test_update_rewrites_file() {
        let dir = tempdir().unwrap();
        let repo = FileRepository::open(dir.path(), "dummy").unwrap();
        let created = repo.create(&Record::new().with("name", "Old Name")).unwrap();

        let updated = repo
            .update(created.id().unwrap(), &Record::new().with("name", "New Name"))
            .unwrap();
        assert_eq!(updated.get("name"), Value::from("New Name"));
        assert!(updated.updated_at().unwrap() >= created.updated_at().unwrap());

        let reloaded = repo.get_by_id(created.id().unwrap()).unwrap().unwrap();
        assert_eq!(reloaded.get("name"), Value::from("New Name"));
    }

    #[test]
    fn test_update_missing_is_not_found() {
        let dir = tempdir().unwrap();
        let repo = FileRepository::open(dir.path(), "dummy").unwrap();
        let result = repo.update(5, &Record::new().with("name", "x"));
        assert!(result.is_err());
        assert_eq!(result.unwrap_err().kind(), &ErrorKind::NotFound);
    }

    #[test]
    fn test_hard_delete_removes_file() {
        let dir = tempdir().unwrap();
        let repo = FileRepository::open(dir.path(), "dummy").unwrap();
        let created = repo.create(&Record::new().with("name", "A")).unwrap();

        assert!(repo.delete(created.id().unwrap(), false).unwrap());
        assert!(!dir.path().join("dummy/1.json").exists());
        assert!(!repo.delete(created.id().unwrap(), false).unwrap());
    }

    #[test]
    fn test_soft_delete_keeps_file_with_marker() {
        let dir = tempdir().unwrap();
        let repo = FileRepository::open(dir.path(), "dummy").unwrap();
        let created = repo.create(&Record::new().with("name", "A")).unwrap();

        assert!(repo.delete(created.id().unwrap(), true).unwrap());
        let fetched = repo.get_by_id(created.id().unwrap()).unwrap().unwrap();
        assert!(fetched.deleted_at().is_some());
    }

    #[test]
    fn test_list_all_returns_records_in_id_order() {
        let dir = tempdir().unwrap();
        let repo = FileRepository::open(dir.path(), "dummy").unwrap();
        for name in ["A", "B", "C"] {
            repo.create(&Record::new().with("name", name)).unwrap();
        }
        let all = repo.list_all().unwrap();
        assert_eq!(
            all.iter().filter_map(Record::id).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
    }

    #[test]
    fn test_filter_uses_evaluator() {
        let dir = tempdir().unwrap();
        let repo = FileRepository::open(dir.path(), "dummy").unwrap();
        repo.create(&Record::new().with("name", "Match").with("score", 30i64))
            .unwrap();
        repo.create(&Record::new().with("name", "No Match").with("score", 5i64))
            .unwrap();

        let spec = FilterSpec::new().with(field("score").gt(20i64));
        let page = repo.filter(&spec, &FindOptions::new()).unwrap();
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].get("name"), Value::from("Match"));
    }

    #[test]
    fn test_enum_fields_serialize_as_member_name_on_disk() {
        let dir = tempdir().unwrap();
        let repo = FileRepository::open(dir.path(), "dummy").unwrap();
        let created = repo
            .create(&Record::new().with("status", Value::Enum("playing".into())))
            .unwrap();

        let content =
            fs::read_to_string(dir.path().join(format!("dummy/{}.json", created.id().unwrap())))
                .unwrap();
        let json: serde_json::Value = serde_json::from_str(&content).unwrap();
        assert_eq!(json["status"], serde_json::Value::String("playing".into()));
    }

    #[test]
    fn test_atomic_restores_directory_on_error() {
        let dir = tempdir().unwrap();
        let repo = FileRepository::open(dir.path(), "dummy").unwrap();
        repo.create(&Record::new().with("name", "keep")).unwrap();

        let result = repo.atomic(&mut || {
            repo.create(&Record::new().with("name", "doomed"))?;
            repo.delete(1, false)?;
            Err(ShelfError::new("boom", ErrorKind::InternalError))
        });

        assert!(result.is_err());
        let all = repo.list_all().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].get("name"), Value::from("keep"));
    }
}
